pub mod api;
pub mod config;
pub mod data_structures;
pub mod openai;
pub mod price;
pub mod sentiment;
pub mod yahoo;

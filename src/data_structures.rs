use crate::config::SharedAzureConfig;
use crate::openai::ChatCompletion;
use crate::price::Clock;
use crate::yahoo::MarketDataProvider;
use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// --- Request / Response Types ---

/// Language tag accepted by the analyze endpoint. Validated but not used
/// when building the prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Zh,
    Multi,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SentimentRequest {
    pub text: String,
    #[serde(default)]
    pub lang: Lang,
}

/// Shape the model is asked to produce. Only used for inspection; the
/// analyze endpoint always returns the raw completion text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: String,
    pub score: f64,
    pub insight: String,
}

impl SentimentResult {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw.trim()).ok()
    }
}

/// `[epoch_milliseconds, closing_price]`, serialized as a two-element array.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint(pub i64, pub f64);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceResponse {
    pub prices: Vec<PricePoint>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

// Error body in the `{"detail": ...}` shape
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

// --- Type Aliases for Shared State ---

pub type SharedChatClient = Arc<dyn ChatCompletion>;
pub type SharedMarketData = Arc<dyn MarketDataProvider>;
pub type SharedClock = Arc<dyn Clock>;

#[derive(Clone)]
pub struct AppState {
    pub azure: SharedAzureConfig,
    pub chat: SharedChatClient,
    pub market_data: SharedMarketData,
    pub clock: SharedClock,
}

impl FromRef<AppState> for SharedAzureConfig {
    fn from_ref(app_state: &AppState) -> SharedAzureConfig {
        app_state.azure.clone()
    }
}

impl FromRef<AppState> for SharedChatClient {
    fn from_ref(app_state: &AppState) -> SharedChatClient {
        app_state.chat.clone()
    }
}

impl FromRef<AppState> for SharedMarketData {
    fn from_ref(app_state: &AppState) -> SharedMarketData {
        app_state.market_data.clone()
    }
}

impl FromRef<AppState> for SharedClock {
    fn from_ref(app_state: &AppState) -> SharedClock {
        app_state.clock.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_defaults_to_en() {
        let req: SentimentRequest = serde_json::from_str(r#"{"text": "Tesla beats earnings"}"#).unwrap();
        assert_eq!(req.lang, Lang::En);
    }

    #[test]
    fn test_lang_rejects_unknown_tag() {
        let result = serde_json::from_str::<SentimentRequest>(r#"{"text": "x", "lang": "fr"}"#);
        assert!(result.is_err());
        let req: SentimentRequest = serde_json::from_str(r#"{"text": "x", "lang": "multi"}"#).unwrap();
        assert_eq!(req.lang, Lang::Multi);
    }

    #[test]
    fn test_price_point_serializes_as_pair() {
        let response = PriceResponse {
            prices: vec![PricePoint(1_700_000_000_000, 100.5)],
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"prices":[[1700000000000,100.5]]}"#
        );
    }

    #[test]
    fn test_sentiment_result_parse() {
        let parsed = SentimentResult::parse(
            r#"{"label": "positive", "score": 0.9, "insight": "Earnings beat expectations."}"#,
        )
        .unwrap();
        assert_eq!(parsed.label, "positive");
        assert!(SentimentResult::parse("not json at all").is_none());
    }
}

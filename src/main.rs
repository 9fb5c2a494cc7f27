use sentiment_service::{
    api,
    config::AppConfig,
    data_structures::AppState,
    openai::AzureOpenAiClient,
    price::SystemClock,
    yahoo::YahooClient,
};
use std::{net::SocketAddr, process::ExitCode, sync::Arc};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let app_config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    // Set a global span with node_name for all subsequent logs
    let _span = tracing::info_span!("node", name = %app_config.node_name).entered();

    tracing::info!("Starting sentiment-service");
    tracing::info!(
        environment = %app_config.environment,
        port = app_config.port,
        azure_configured = app_config.azure.is_configured(),
        "Loaded configuration"
    );
    if !app_config.azure.is_configured() {
        tracing::warn!("AZURE_OPENAI_ENDPOINT or AZURE_OPENAI_KEY not set, sentiment requests will fail");
    }

    let chat = match AzureOpenAiClient::new(app_config.azure.clone()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Azure OpenAI client");
            return ExitCode::FAILURE;
        }
    };
    let market_data = match YahooClient::new(true) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize market data client");
            return ExitCode::FAILURE;
        }
    };

    let app_state = AppState {
        azure: app_config.azure.clone(),
        chat: Arc::new(chat),
        market_data: Arc::new(market_data),
        clock: Arc::new(SystemClock),
    };

    let app = api::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "Server listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

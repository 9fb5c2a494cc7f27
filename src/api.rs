use crate::config::SharedAzureConfig;
use crate::data_structures::{
    AppState, ErrorDetail, HealthResponse, SentimentRequest, SharedChatClient, SharedClock,
    SharedMarketData,
};
use crate::openai::OpenAiError;
use crate::{price, sentiment};
use axum::{
    Router,
    body::Bytes,
    extract::{FromRequest, Json, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/sentiment/analyze", post(analyze_sentiment_handler))
        .route("/api/tesla/price", get(tesla_price_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn root_handler() -> impl IntoResponse {
    Json(HealthResponse {
        message: "Sentiment service is running".to_string(),
    })
}

#[instrument(skip(azure, chat, req))]
pub async fn analyze_sentiment_handler(
    State(azure): State<SharedAzureConfig>,
    State(chat): State<SharedChatClient>,
    ValidatedJson(req): ValidatedJson<SentimentRequest>,
) -> Response {
    debug!("Received sentiment analysis request");

    match sentiment::analyze(&azure, chat.as_ref(), &req).await {
        Ok(content) => (StatusCode::OK, Json(content)).into_response(),
        Err(OpenAiError::MissingConfiguration) => detail_response("Missing Azure OpenAI configuration".to_string()),
        Err(e) => {
            error!(error = %e, "Sentiment provider call failed");
            detail_response(format!("Azure OpenAI error: {}", e))
        }
    }
}

#[instrument(skip(market_data, clock))]
pub async fn tesla_price_handler(
    State(market_data): State<SharedMarketData>,
    State(clock): State<SharedClock>,
) -> Response {
    debug!("Received price request");

    match price::fetch_price_series(market_data.as_ref(), clock.as_ref()).await {
        Ok(series) => {
            info!(points = series.prices.len(), "Returning price series");
            (StatusCode::OK, Json(series)).into_response()
        }
        Err(e) => {
            // No detail is exposed on this route
            error!(error = %e, "Price fetch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

fn detail_response(detail: String) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorDetail { detail })).into_response()
}

/// JSON body extractor that answers every malformed body with
/// `422 {"detail": ...}`. A missing content-type is read as JSON.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !accepts_json(req.headers().get(header::CONTENT_TYPE)) {
            return Err(validation_response("Content-Type must be application/json".to_string()));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| validation_response(e.body_text()))?;

        serde_json::from_slice(&bytes)
            .map(ValidatedJson)
            .map_err(|e| validation_response(e.to_string()))
    }
}

fn accepts_json(content_type: Option<&header::HeaderValue>) -> bool {
    let Some(value) = content_type else {
        return true;
    };
    let Ok(value) = value.to_str() else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn validation_response(detail: String) -> Response {
    debug!(%detail, "Rejected request body");
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorDetail { detail })).into_response()
}

use crate::config::AzureOpenAiConfig;
use crate::data_structures::{SentimentRequest, SentimentResult};
use crate::openai::{ChatCompletion, ChatMessage, OpenAiError};
use tracing::{debug, info, instrument, warn};

pub const SYSTEM_PROMPT: &str = "You are a financial sentiment analyst.";
pub const MODEL: &str = "gpt-4o-mini";

pub fn build_prompt(text: &str) -> String {
    format!(
        "Analyze the sentiment of the following text in a financial context.\n\
         Classify as one of: positive, negative, or neutral.\n\
         Then explain the reasoning in 1-2 sentences.\n\
         \n\
         Text: {text}\n\
         Return JSON format with keys: label, score (0-1), and insight."
    )
}

/// Runs one classification and returns the model's text untouched.
///
/// Fails with [`OpenAiError::MissingConfiguration`] before any provider call
/// when the endpoint or key is absent. `req.lang` is not consulted.
#[instrument(skip(azure, chat, req), fields(lang = ?req.lang, text_len = req.text.len()))]
pub async fn analyze(
    azure: &AzureOpenAiConfig,
    chat: &dyn ChatCompletion,
    req: &SentimentRequest,
) -> Result<String, OpenAiError> {
    if !azure.is_configured() {
        warn!("Azure OpenAI configuration missing, skipping provider call");
        return Err(OpenAiError::MissingConfiguration);
    }

    let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(build_prompt(&req.text))];
    let content = chat.complete(MODEL, &messages).await?;

    match SentimentResult::parse(&content) {
        Some(result) => info!(label = %result.label, score = result.score, "Sentiment classified"),
        None => debug!("Completion is not a JSON sentiment object, passing through"),
    }

    Ok(content)
}

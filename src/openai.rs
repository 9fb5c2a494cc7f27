use crate::config::SharedAzureConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("Azure OpenAI endpoint or key is not configured")]
    MissingConfiguration,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Error code: {status} - {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid response body: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("response contained no message content")]
    EmptyChoices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// A chat-completion backend: takes role-tagged messages, returns the text of
/// the first choice.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, OpenAiError>;
}

/// Azure OpenAI chat-completions client.
///
/// Built once at startup even when credentials are missing; the check happens
/// on every call instead.
pub struct AzureOpenAiClient {
    client: Client,
    config: SharedAzureConfig,
}

impl AzureOpenAiClient {
    pub fn new(config: SharedAzureConfig) -> Result<Self, OpenAiError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    pub fn completions_url(&self) -> Result<String, OpenAiError> {
        let (endpoint, _) = self.config.credentials().ok_or(OpenAiError::MissingConfiguration)?;
        Ok(format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        ))
    }
}

#[async_trait]
impl ChatCompletion for AzureOpenAiClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, OpenAiError> {
        let (_, api_key) = self.config.credentials().ok_or(OpenAiError::MissingConfiguration)?;
        let url = self.completions_url()?;

        debug!(model, message_count = messages.len(), "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("api-key", api_key)
            .json(&ChatCompletionRequest { model, messages })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Chat completion request rejected");
            return Err(OpenAiError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        first_choice_content(&bytes)
    }
}

fn first_choice_content(body: &[u8]) -> Result<String, OpenAiError> {
    let parsed: ChatCompletionResponse = serde_json::from_slice(body)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(OpenAiError::EmptyChoices)
}

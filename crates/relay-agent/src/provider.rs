use async_trait::async_trait;

use relay_core::types::{ContentPart, Role};

/// One role-tagged message in the request input.
#[derive(Debug, Clone)]
pub struct InputMessage {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl InputMessage {
    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![ContentPart::Text(text.into())],
        }
    }
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    /// System-level instructions (the persona), if any.
    pub instructions: Option<String>,
    /// Prior turns followed by the newest user turn. Never empty.
    pub input: Vec<InputMessage>,
    pub max_output_tokens: u32,
}

impl ChatRequest {
    /// A history-free request carrying a single user text part.
    pub fn single_text(model: &str, text: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            instructions: None,
            input: vec![InputMessage::text(Role::User, text)],
            max_output_tokens,
        }
    }
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

/// Common interface for the language-model API.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Send a request and wait for the full response.
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("response contained no output text")]
    EmptyResponse,
}

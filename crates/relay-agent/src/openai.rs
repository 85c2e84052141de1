use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, warn};

use relay_core::types::{ContentPart, Role};

use crate::provider::{ChatRequest, ChatResponse, InputMessage, LlmProvider, ProviderError};

/// OpenAI Responses API (`/v1/responses`) client.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| "https://api.openai.com".to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(req);
        let url = format!("{}/v1/responses", self.base_url);

        debug!(model = %req.model, messages = req.input.len(), "sending request to OpenAI");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000) // convert seconds to ms
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "OpenAI API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_response(api_resp)
    }
}

fn build_request_body(req: &ChatRequest) -> serde_json::Value {
    let input: Vec<serde_json::Value> = req.input.iter().map(input_item).collect();

    let mut body = serde_json::json!({
        "model": req.model,
        "input": input,
        "max_output_tokens": req.max_output_tokens,
    });
    if let Some(instructions) = &req.instructions {
        body["instructions"] = serde_json::Value::String(instructions.clone());
    }
    body
}

/// User messages carry typed parts; prior assistant replies are plain text.
fn input_item(msg: &InputMessage) -> serde_json::Value {
    match msg.role {
        Role::User => {
            let content: Vec<serde_json::Value> = msg.parts.iter().map(user_part).collect();
            serde_json::json!({ "role": "user", "content": content })
        }
        Role::Assistant | Role::System => {
            let text = msg
                .parts
                .iter()
                .filter_map(ContentPart::as_text)
                .collect::<Vec<_>>()
                .join("\n");
            serde_json::json!({ "role": msg.role.as_str(), "content": text })
        }
    }
}

fn user_part(part: &ContentPart) -> serde_json::Value {
    match part {
        ContentPart::Text(text) => serde_json::json!({ "type": "input_text", "text": text }),
        ContentPart::Image { bytes, mime_type } => {
            let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
            serde_json::json!({
                "type": "input_image",
                "image_url": format!("data:{mime_type};base64,{b64}"),
            })
        }
    }
}

/// Collect the reply text: `output_text` when the server provides the
/// aggregate, otherwise every `output_text` block of every message item.
fn parse_response(resp: ApiResponse) -> Result<ChatResponse, ProviderError> {
    let content = match resp.output_text.filter(|t| !t.is_empty()) {
        Some(text) => text,
        None => resp
            .output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|c| c.kind == "output_text")
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join(""),
    };

    if content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(ChatResponse {
        content,
        model: resp.model,
        tokens_in: resp.usage.as_ref().map(|u| u.input_tokens).unwrap_or(0),
        tokens_out: resp.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0),
    })
}

// OpenAI API response types (private, deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    output_text: Option<String>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Deserialize)]
struct OutputContent {
    #[serde(rename = "type", default)]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

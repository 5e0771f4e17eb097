use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::provider::{BackendError, ModelInfo, TextBackend};
use crate::ai::transport::{http_client, send_with_retry};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.1;

pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: http_client(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    fn build_request(&self, system: &str, user: &str) -> ClaudeRequest {
        ClaudeRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: system.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        }
    }
}

#[async_trait]
impl TextBackend for ClaudeClient {
    fn name(&self) -> &str {
        "claude"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        if self.api_key.is_empty() {
            return Err(BackendError::MissingApiKey {
                provider: "claude".to_string(),
            });
        }

        let request_body = self.build_request(system, user);
        let resp = send_with_retry(|| {
            self.client
                .post(CLAUDE_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", CLAUDE_API_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
        })
        .await?;

        let claude_resp: ClaudeResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::ParseError(format!("Failed to parse JSON: {}", e)))?;
        claude_resp.into_text()
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "claude".to_string(),
            model_name: self.model.clone(),
            temperature: Some(TEMPERATURE),
        }
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeResponse {
    fn into_text(self) -> Result<String, BackendError> {
        if self.content.is_empty() {
            return Err(BackendError::InvalidResponse(
                "Empty content array in response".to_string(),
            ));
        }
        // Concatenate text blocks; other block types carry no netlist text.
        Ok(self
            .content
            .into_iter()
            .filter(|c| c.content_type.as_deref().map_or(true, |t| t == "text"))
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::provider::{BackendError, ModelInfo, TextBackend};
use crate::ai::transport::{http_client, send_with_retry};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1";
const TEMPERATURE: f32 = 0.1;

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: http_client(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Point the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, system: &str, user: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
        }
    }
}

#[async_trait]
impl TextBackend for OpenAIClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        if self.api_key.is_empty() {
            return Err(BackendError::MissingApiKey {
                provider: "openai".to_string(),
            });
        }

        let body = self.build_request(system, user);
        let url = self.endpoint();
        let resp = send_with_retry(|| {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::ParseError(format!("Failed to parse JSON: {}", e)))?;
        chat.into_text()
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model_name: self.model.clone(),
            temperature: Some(TEMPERATURE),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String, BackendError> {
        let choice = self.choices.into_iter().next().ok_or_else(|| {
            BackendError::InvalidResponse("Empty choices array in response".to_string())
        })?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let client = OpenAIClient::new("k".to_string());
        let body = serde_json::to_value(client.build_request("sys", "spec")).unwrap();
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "spec");
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let client = OpenAIClient::new("k".to_string())
            .with_base_url("http://localhost:11434/v1/".to_string());
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_response_text() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"* t\n.end"}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.into_text().unwrap(), "* t\n.end");
    }

    #[test]
    fn test_null_content_is_empty() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(resp.into_text().unwrap(), "");
    }

    #[test]
    fn test_no_choices_is_invalid() {
        let resp: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(resp.into_text(), Err(BackendError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = OpenAIClient::new(String::new());
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, BackendError::MissingApiKey { .. }));
    }
}

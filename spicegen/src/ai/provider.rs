//! Text-generation backend trait
//!
//! The generation loop only needs one capability from a backend: turn a
//! system instruction plus user content into text. Any service with that
//! shape can be plugged in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("API request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Rate limited. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },
    #[error("Missing API key for {provider}. Set it in your shell or .env file.")]
    MissingApiKey { provider: String },
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Information about the model behind a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider name (e.g., "openai", "claude")
    pub provider: String,

    /// Model name (e.g., "gpt-4.1")
    pub model_name: String,

    /// Sampling temperature sent with each request, if any
    pub temperature: Option<f32>,
}

/// Common trait for all text-generation backends
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Request a completion. Absent content is returned as an empty string.
    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError>;

    /// Get model info
    fn model_info(&self) -> ModelInfo;
}

#[async_trait]
impl<T: TextBackend + ?Sized> TextBackend for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        (**self).complete(system, user).await
    }

    fn model_info(&self) -> ModelInfo {
        (**self).model_info()
    }
}

pub mod claude;
pub mod openai;
pub mod provider;
mod transport;

pub use claude::ClaudeClient;
pub use openai::OpenAIClient;
pub use provider::{BackendError, ModelInfo, TextBackend};

use crate::config::{BackendConfig, Provider};

/// Build the backend selected by the resolved configuration.
pub fn build_backend(config: &BackendConfig) -> Box<dyn TextBackend> {
    match config.provider {
        Provider::OpenAI => {
            let mut client = OpenAIClient::new(config.api_key.clone());
            if let Some(ref model) = config.model {
                client = client.with_model(model.clone());
            }
            if let Some(ref url) = config.base_url {
                client = client.with_base_url(url.clone());
            }
            Box::new(client)
        }
        Provider::Claude => {
            let mut client = ClaudeClient::new(config.api_key.clone());
            if let Some(ref model) = config.model {
                client = client.with_model(model.clone());
            }
            Box::new(client)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_backend_by_provider() {
        let mut config = BackendConfig {
            provider: Provider::OpenAI,
            api_key: "key".to_string(),
            model: None,
            base_url: None,
        };
        let backend = build_backend(&config);
        assert_eq!(backend.name(), "openai");
        assert_eq!(backend.model_info().model_name, openai::DEFAULT_MODEL);

        config.provider = Provider::Claude;
        config.model = Some("claude-custom".to_string());
        let backend = build_backend(&config);
        assert_eq!(backend.name(), "claude");
        assert_eq!(backend.model_info().model_name, "claude-custom");
    }
}

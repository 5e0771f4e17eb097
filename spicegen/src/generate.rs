//! Netlist generation with validation and bounded retry.
//!
//! Each attempt sends the same system prompt and circuit description to the
//! backend and validates the answer. The first accepted answer is returned.
//! Rejections are retried until `max_attempts` is reached. Backend failures end the call
//! immediately and are never retried here.

use serde::Serialize;
use thiserror::Error;

use crate::ai::{BackendError, TextBackend};
use crate::netlist::{build_system_prompt, DurationToken, NetlistValidator};

/// One initial attempt plus two retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Text backend request failed on attempt {attempt}: {source}")]
    Backend {
        attempt: u32,
        #[source]
        source: BackendError,
    },
    #[error("Failed to generate a valid LTspice netlist after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: String },
    #[error("max_attempts must be at least 1 (got {0})")]
    InvalidMaxAttempts(u32),
}

/// An accepted netlist and how it was obtained.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedNetlist {
    pub text: String,
    /// Attempt number that produced `text`, starting at 1.
    pub attempts: u32,
    /// Rejection reasons of the earlier attempts, in order.
    pub rejections: Vec<String>,
}

pub struct NetlistGenerator<B> {
    backend: B,
    validator: NetlistValidator,
}

impl<B: TextBackend> NetlistGenerator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            validator: NetlistValidator::new(),
        }
    }

    /// Use a validator with a custom prose-word policy.
    pub fn with_validator(mut self, validator: NetlistValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Generate a netlist for `spec_text`, returning only validated text.
    pub async fn generate(
        &self,
        spec_text: &str,
        tran_stop: Option<&DurationToken>,
        max_attempts: u32,
    ) -> Result<String, GenerationError> {
        self.generate_detailed(spec_text, tran_stop, max_attempts)
            .await
            .map(|generated| generated.text)
    }

    /// Like [`generate`](Self::generate) but also reports the attempt count
    /// and the reasons earlier attempts were rejected.
    pub async fn generate_detailed(
        &self,
        spec_text: &str,
        tran_stop: Option<&DurationToken>,
        max_attempts: u32,
    ) -> Result<GeneratedNetlist, GenerationError> {
        if max_attempts == 0 {
            return Err(GenerationError::InvalidMaxAttempts(max_attempts));
        }

        let system_prompt = build_system_prompt(tran_stop);
        let mut rejections: Vec<String> = Vec::new();
        let mut attempt: u32 = 1;

        loop {
            tracing::info!(
                "Requesting netlist from {} (attempt {}/{})",
                self.backend.name(),
                attempt,
                max_attempts
            );
            let response = self
                .backend
                .complete(&system_prompt, spec_text)
                .await
                .map_err(|source| GenerationError::Backend { attempt, source })?;

            let candidate = response.trim();
            let verdict = self.validator.validate(candidate, tran_stop);
            if verdict.accepted {
                tracing::info!("Generated netlist passed validation (attempt {})", attempt);
                return Ok(GeneratedNetlist {
                    text: candidate.to_string(),
                    attempts: attempt,
                    rejections,
                });
            }

            tracing::warn!(
                "Generated netlist failed validation (attempt {}/{}): {}",
                attempt,
                max_attempts,
                verdict.reason
            );

            if attempt >= max_attempts {
                return Err(GenerationError::Exhausted {
                    attempts: attempt,
                    reason: verdict.reason,
                });
            }
            rejections.push(verdict.reason);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ModelInfo;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const GOOD: &str = "* t\nR1 a 0 1k\n.tran 1ms\n.end";

    struct Scripted {
        replies: Mutex<VecDeque<String>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TextBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, BackendError> {
            *self.calls.lock().unwrap() += 1;
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                Ok(replies.pop_front().unwrap_or_default())
            } else {
                Ok(replies.front().cloned().unwrap_or_default())
            }
        }

        fn model_info(&self) -> ModelInfo {
            ModelInfo {
                provider: "scripted".to_string(),
                model_name: "test".to_string(),
                temperature: None,
            }
        }
    }

    #[tokio::test]
    async fn test_first_attempt_accepted() {
        let generator = NetlistGenerator::new(Scripted::new(&[GOOD]));
        let generated = generator.generate_detailed("spec", None, 3).await.unwrap();
        assert_eq!(generated.text, GOOD);
        assert_eq!(generated.attempts, 1);
        assert!(generated.rejections.is_empty());
        assert_eq!(generator.backend().calls(), 1);
    }

    #[tokio::test]
    async fn test_response_is_trimmed() {
        let padded = format!("\n\n  {}  \n", GOOD);
        let generator = NetlistGenerator::new(Scripted::new(&[padded.as_str()]));
        assert_eq!(generator.generate("spec", None, 1).await.unwrap(), GOOD);
    }

    #[tokio::test]
    async fn test_rejections_are_recorded() {
        let generator = NetlistGenerator::new(Scripted::new(&["", "```\n", GOOD]));
        let generated = generator.generate_detailed("spec", None, 3).await.unwrap();
        assert_eq!(generated.attempts, 3);
        assert_eq!(
            generated.rejections,
            vec![
                "Netlist is empty.".to_string(),
                "Netlist contains markdown fences.".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_single_attempt_makes_one_call() {
        let generator = NetlistGenerator::new(Scripted::new(&["nope"]));
        let err = generator.generate("spec", None, 1).await.unwrap_err();
        assert!(matches!(err, GenerationError::Exhausted { attempts: 1, .. }));
        assert_eq!(generator.backend().calls(), 1);

        let generator = NetlistGenerator::new(Scripted::new(&[GOOD]));
        generator.generate("spec", None, 1).await.unwrap();
        assert_eq!(generator.backend().calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_rejected_without_calls() {
        let generator = NetlistGenerator::new(Scripted::new(&[GOOD]));
        let err = generator.generate("spec", None, 0).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidMaxAttempts(0)));
        assert_eq!(generator.backend().calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_validator_is_used() {
        let prose = "* t\nXamp the out opamp\n.tran 1ms\n.end";
        let generator = NetlistGenerator::new(Scripted::new(&[prose]))
            .with_validator(NetlistValidator::with_prose_words(["please"]).unwrap());
        assert_eq!(generator.generate("spec", None, 1).await.unwrap(), prose);
    }
}

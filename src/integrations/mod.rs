// Language model backends used by the teacher and student agents

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{ModelConfig, ModelProvider};
use crate::error::TutorResult;

pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

/// Failures surfaced by a language model backend
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    /// The service could not be reached at all
    #[error("model service unreachable at {host}: {message}")]
    Unreachable { host: String, message: String },

    /// The service answered with a non-success status
    #[error("model service returned status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("model '{model}' returned an empty response")]
    EmptyResponse { model: String },

    /// The service accepted the request but did not answer in time
    #[error("model request timed out: {0}")]
    Timeout(String),

    #[error("model request failed: {0}")]
    Request(String),
}

impl ModelError {
    /// Whether the failure means the service is gone, as opposed to one bad request
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ModelError::Unreachable { .. })
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(error: reqwest::Error) -> Self {
        // A connect timeout reports both; the connection failure wins
        if error.is_connect() {
            let host = error
                .url()
                .map(|url| url.origin().ascii_serialization())
                .unwrap_or_else(|| "<unknown>".to_string());
            ModelError::Unreachable {
                host,
                message: error.to_string(),
            }
        } else if error.is_timeout() {
            ModelError::Timeout(error.to_string())
        } else if let Some(status) = error.status() {
            ModelError::Status {
                code: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            ModelError::Request(error.to_string())
        }
    }
}

/// A text generation service
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model used when a request does not name one
    fn default_model(&self) -> &str;

    /// Whether the service is up and answering
    async fn is_available(&self) -> bool;

    /// Generate a completion for `prompt`, using `model` or the default model
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, ModelError>;
}

/// Build the backend selected by the configuration
pub fn connect(config: &ModelConfig) -> TutorResult<Arc<dyn LanguageModel>> {
    info!(
        "Connecting to {:?} model backend (model: {})",
        config.provider, config.model
    );
    let model: Arc<dyn LanguageModel> = match config.provider {
        ModelProvider::Ollama => Arc::new(OllamaClient::new(config)?),
        ModelProvider::OpenAi => Arc::new(OpenAIClient::new(config)),
    };
    Ok(model)
}

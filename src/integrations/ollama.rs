use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::ModelConfig;
use crate::error::TutorResult;
use crate::integrations::{LanguageModel, ModelError};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    model: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &ModelConfig) -> TutorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let host = config.host.trim_end_matches('/').to_string();

        info!(
            "OllamaClient initialized with host: {}, model: {}",
            host, config.model
        );

        Ok(Self {
            http,
            host,
            model: config.model.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Names of the models pulled on the server
    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let tags: TagsResponse = self
            .http
            .get(format!("{}/api/tags", self.host))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether `name` is available, accepting the implicit ":latest" tag
    pub async fn has_model(&self, name: &str) -> Result<bool, ModelError> {
        let models = self.list_models().await?;
        Ok(models
            .iter()
            .any(|m| m == name || m.strip_suffix(":latest") == Some(name)))
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn default_model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        match self.list_models().await {
            Ok(_) => {
                debug!("Ollama server is running and accessible.");
                true
            }
            Err(e) => {
                error!("Ollama server not accessible at {}. Error: {}", self.host, e);
                false
            }
        }
    }

    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, ModelError> {
        if !self.is_available().await {
            return Err(ModelError::Unreachable {
                host: self.host.clone(),
                message: "Ollama server is not running".to_string(),
            });
        }

        let target_model = model.unwrap_or(&self.model);
        info!(
            "Generating response from model '{}' with prompt: '{}...'",
            target_model,
            prompt.chars().take(50).collect::<String>()
        );

        let request = GenerateRequest {
            model: target_model,
            prompt,
            stream: false,
        };

        let response: GenerateResponse = self
            .http
            .post(format!("{}/api/generate", self.host))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.response.is_empty() {
            return Err(ModelError::EmptyResponse {
                model: target_model.to_string(),
            });
        }

        Ok(response.response)
    }
}

use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, error};

use crate::config::ModelConfig;
use crate::integrations::{LanguageModel, ModelError};

const OPENAI_HOST: &str = "https://api.openai.com";

/// OpenAI chat completion backend
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    pub fn new(config: &ModelConfig) -> Self {
        let mut openai_config = async_openai::config::OpenAIConfig::new();

        // Falls back to OPENAI_API_KEY when not configured
        if let Some(api_key) = &config.api_key {
            openai_config = openai_config.with_api_key(api_key);
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

fn map_openai_error(error: OpenAIError) -> ModelError {
    match error {
        OpenAIError::Reqwest(e) if e.is_connect() => ModelError::Unreachable {
            host: OPENAI_HOST.to_string(),
            message: e.to_string(),
        },
        OpenAIError::Reqwest(e) if e.is_timeout() => ModelError::Timeout(e.to_string()),
        other => ModelError::Request(other.to_string()),
    }
}

#[async_trait]
impl LanguageModel for OpenAIClient {
    fn default_model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        match self.client.models().list().await {
            Ok(_) => true,
            Err(e) => {
                error!("OpenAI API not accessible: {}", e);
                false
            }
        }
    }

    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, ModelError> {
        let target_model = model.unwrap_or(&self.model);
        debug!("Executing prompt against OpenAI model '{}'", target_model);

        let message = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
            name: None,
        });

        let mut request = CreateChatCompletionRequestArgs::default()
            .model(target_model)
            .messages(vec![message])
            .build()
            .map_err(map_openai_error)?;

        if let Some(max_tokens) = self.max_tokens {
            #[allow(deprecated)]
            {
                request.max_tokens = Some(max_tokens);
            }
        }

        if let Some(temp) = self.temperature {
            request.temperature = Some(temp);
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ModelError::EmptyResponse {
                model: target_model.to_string(),
            })
    }
}

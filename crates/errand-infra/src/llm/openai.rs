//! OpenAI-backed completion client for classification.
//!
//! Uses [`async_openai`] for type-safe request/response handling. Only the
//! narrow `CompletionClient` contract is exposed: one system/user prompt
//! pair in, one textual completion out.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use errand_core::llm::completion::CompletionClient;
use errand_types::error::CompletionError;

/// Default model for classification completions.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI chat-completion client.
///
/// Does NOT derive Debug: the API key lives inside the `async_openai`
/// client and must not leak into logs.
pub struct OpenAiCompletionClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletionClient {
    /// Create a client against the official OpenAI endpoint.
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    /// Override the API base URL (proxies, tests).
    pub fn with_api_base(api_key: &str, api_base: &str, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }
}

impl CompletionClient for OpenAiCompletionClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, CompletionError> {
        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.to_string()),
                    name: None,
                }),
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(user.to_string()),
                    name: None,
                }),
            ],
            temperature: Some(temperature),
            ..Default::default()
        };

        tracing::debug!(model = self.model.as_str(), "requesting classification completion");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(content)
    }
}

fn map_openai_error(err: async_openai::error::OpenAIError) -> CompletionError {
    let text = err.to_string();
    if text.contains("401") || text.contains("invalid_api_key") {
        CompletionError::AuthenticationFailed
    } else {
        CompletionError::Provider(text)
    }
}

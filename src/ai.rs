//! AI provider — OpenAI-compatible chat-completions client.
//!
//! The refiner talks to an `AiProvider` trait object so tests can substitute
//! scripted providers. The shipped implementation works against the OpenAI
//! API or any compatible endpoint (Azure, local Ollama).

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::error::ProviderError;

/// An external completion capability.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Run a single system+user completion, returning the raw text content.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// OpenAI-compatible provider over reqwest.
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: AiConfig,
}

impl OpenAiProvider {
    pub fn new(config: AiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
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
            temperature: 0.7,
            max_tokens: 1000,
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("HTTP request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "AI provider returned error");
            return Err(ProviderError::BadStatus {
                provider: "openai".to_string(),
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let chat_response: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: "openai".to_string(),
                    reason: format!("failed to parse API response: {e}"),
                })?;

        let content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "openai".to_string(),
                reason: "no response choices returned".to_string(),
            })?;

        debug!(len = content.len(), "received AI completion");
        Ok(content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn provider_constructs_from_config() {
        let provider = OpenAiProvider::new(AiConfig {
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            api_key: SecretString::from("sk-test"),
            model: "gpt-4o-mini".into(),
        });
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn chat_request_serializes_response_format() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            temperature: 0.7,
            max_tokens: 1000,
            response_format: Some(ResponseFormat {
                format_type: "json_object".into(),
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }
}

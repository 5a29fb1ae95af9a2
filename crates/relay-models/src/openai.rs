//! OpenAI provider implementation.
//!
//! This module provides an implementation of the `Provider` trait for OpenAI's
//! chat completions API.

use async_trait::async_trait;
use relay_abstraction::{
    ChatMessage, Provider, ProviderError, ProviderKind, ProviderResponse, ProviderUsage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error};

/// OpenAI provider implementation.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    /// The model id (e.g., "gpt-4o", "gpt-4o-mini").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the OpenAI API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAiProvider` with the given model id.
    ///
    /// # Arguments
    /// * `model_id` - The OpenAI model id to use (e.g., "gpt-4o")
    ///
    /// # Errors
    /// Returns a `ProviderError` if the API key is not found in environment variables.
    pub fn new(model_id: String) -> Result<Self, ProviderError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ProviderError::UnsupportedProvider(
                "OPENAI_API_KEY environment variable not set".to_string(),
            )
        })?;

        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `OpenAiProvider` with an explicit API key.
    ///
    /// # Arguments
    /// * `model_id` - The OpenAI model id to use
    /// * `api_key` - The API key for authentication
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            client: Client::new(),
        }
    }

    /// Overrides the base URL (local gateways, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ProviderResponse, ProviderError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            "OpenAiProvider invoking chat completion"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let request_body = OpenAiRequest {
            model: self.model_id.clone(),
            messages: messages
                .iter()
                .map(|msg| OpenAiMessage { role: msg.role.clone(), content: msg.content.clone() })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to OpenAI API");
                ProviderError::RequestError(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                "OpenAI API returned error status"
            );

            // 402 and 429 signal quota/rate pressure; both are retryable upstream
            if status == 402 || status == 429 {
                return Err(ProviderError::RateLimited {
                    provider: "openai".to_string(),
                    message: Some(error_text),
                });
            }

            return Err(ProviderError::ResponseError(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let openai_response: OpenAiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse OpenAI API response");
            ProviderError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let content =
            openai_response.choices.first().map(|c| c.message.content.clone()).ok_or_else(
                || {
                    error!("No content in OpenAI API response");
                    ProviderError::ResponseError("No content in API response".to_string())
                },
            )?;

        let usage = openai_response.usage.map(|u| ProviderUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(ProviderResponse {
            provider: ProviderKind::OpenAi,
            model_id: self.model_id.clone(),
            content,
            usage,
        })
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// OpenAI API request/response structures

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)] // Matches API naming
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

//! Perplexity provider implementation.
//!
//! Perplexity exposes an OpenAI-compatible chat completions API whose models
//! perform web-grounded answering. The router sends web-search traffic here.

use async_trait::async_trait;
use relay_abstraction::{
    ChatMessage, Provider, ProviderError, ProviderKind, ProviderResponse, ProviderUsage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error};

/// Perplexity provider implementation.
#[derive(Debug, Clone)]
pub struct PerplexityProvider {
    /// The model id (e.g., "sonar", "sonar-pro").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the Perplexity API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl PerplexityProvider {
    /// Creates a new `PerplexityProvider` with the given model id.
    ///
    /// # Errors
    /// Returns a `ProviderError` if the API key is not found in environment variables.
    pub fn new(model_id: String) -> Result<Self, ProviderError> {
        let api_key = env::var("PERPLEXITY_API_KEY").map_err(|_| {
            ProviderError::UnsupportedProvider(
                "PERPLEXITY_API_KEY environment variable not set".to_string(),
            )
        })?;

        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `PerplexityProvider` with an explicit API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key,
            base_url: "https://api.perplexity.ai".to_string(),
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
impl Provider for PerplexityProvider {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ProviderResponse, ProviderError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            "PerplexityProvider invoking chat completion"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let request_body = PerplexityRequest {
            model: self.model_id.clone(),
            messages: messages
                .iter()
                .map(|msg| PerplexityMessage {
                    role: msg.role.clone(),
                    content: msg.content.clone(),
                })
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
                error!(error = %e, "Failed to send request to Perplexity API");
                ProviderError::RequestError(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                "Perplexity API returned error status"
            );

            if status == 402 || status == 429 {
                return Err(ProviderError::RateLimited {
                    provider: "perplexity".to_string(),
                    message: Some(error_text),
                });
            }

            return Err(ProviderError::ResponseError(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let perplexity_response: PerplexityResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Perplexity API response");
            ProviderError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let mut content = perplexity_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| {
                error!("No content in Perplexity API response");
                ProviderError::ResponseError("No content in API response".to_string())
            })?;

        // Web-grounded citations arrive out-of-band; append them so downstream
        // source extraction sees the URLs the answer was grounded on.
        if !perplexity_response.citations.is_empty() {
            content.push_str("\n\nSources:\n");
            for citation in &perplexity_response.citations {
                content.push_str("- ");
                content.push_str(citation);
                content.push('\n');
            }
        }

        let usage = perplexity_response.usage.map(|u| ProviderUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(ProviderResponse {
            provider: ProviderKind::Perplexity,
            model_id: self.model_id.clone(),
            content,
            usage,
        })
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Perplexity
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Perplexity API request/response structures (OpenAI-compatible shape)

#[derive(Debug, Serialize)]
struct PerplexityRequest {
    model: String,
    messages: Vec<PerplexityMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PerplexityMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct PerplexityResponse {
    choices: Vec<PerplexityChoice>,
    usage: Option<PerplexityUsage>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PerplexityChoice {
    message: PerplexityMessage,
}

#[derive(Debug, Deserialize)]
struct PerplexityUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

//! OpenAI-compatible chat-completions client

use crate::error::{ApiError, ServiceError};
use crate::provider::{CompletionRequest, ModelService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn map_http_error(error: reqwest::Error, timeout: Duration) -> ServiceError {
    if error.is_timeout() {
        ServiceError::Timeout(timeout.as_millis())
    } else if error.is_connect() {
        ServiceError::Request(format!("Connection error: {}", error))
    } else if let Some(status) = error.status() {
        ServiceError::Request(format!("Request failed with status {}: {}", status, error))
    } else {
        ServiceError::Request(format!("HTTP error: {}", error))
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

fn build_provider_http_client(request_timeout: Duration) -> Result<Client, ApiError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
        .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// Client for any endpoint exposing `POST {endpoint}/chat/completions`.
pub struct OpenAICompatibleClient {
    client: Client,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl OpenAICompatibleClient {
    pub fn new(model: String, endpoint: String, api_key: Option<String>) -> Result<Self, ApiError> {
        let client = build_provider_http_client(PROVIDER_HTTP_REQUEST_TIMEOUT)?;
        Ok(Self {
            client,
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            request_timeout: PROVIDER_HTTP_REQUEST_TIMEOUT,
        })
    }

    /// Replace the whole-request HTTP timeout.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Result<Self, ApiError> {
        self.client = build_provider_http_client(request_timeout)?;
        self.request_timeout = request_timeout;
        Ok(self)
    }
}

#[async_trait]
impl ModelService for OpenAICompatibleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.endpoint);
        let mut request_builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            request_builder =
                request_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        debug!(model = %self.model, prompt_len = request.prompt.len(), "Sending completion request");
        let response = request_builder
            .json(&body)
            .send()
            .await
            .map_err(|e| map_http_error(e, self.request_timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ServiceError::Request(format!(
                "Request failed with status {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("Failed to parse response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ServiceError::Malformed("No choices in response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

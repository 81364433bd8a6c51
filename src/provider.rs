//! Model Service
//!
//! The generative model is an opaque text-completion service reached through
//! [`ModelService`]. The shipped implementation speaks the OpenAI-compatible
//! chat-completions protocol, which covers OpenAI, Ollama and most local
//! inference servers.

use crate::error::{ApiError, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod openai;

pub use openai::OpenAICompatibleClient;

/// One completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text-completion service.
///
/// Every error is treated as transient by the orchestrator and retried.
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;

    /// Model identifier; part of every cache fingerprint.
    fn model_name(&self) -> &str;
}

/// Provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    Ollama,
    LocalCustom,
}

impl ProviderType {
    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("https://api.openai.com/v1"),
            ProviderType::Ollama => Some("http://localhost:11434/v1"),
            ProviderType::LocalCustom => None,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::OpenAI => write!(f, "openai"),
            ProviderType::Ollama => write!(f, "ollama"),
            ProviderType::LocalCustom => write!(f, "local_custom"),
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_type")]
    pub provider_type: ProviderType,

    #[serde(default)]
    pub model: String,

    /// Falls back to `OPENAI_API_KEY` for the openai provider
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_provider_type() -> ProviderType {
    ProviderType::Ollama
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            model: String::new(),
            api_key: None,
            endpoint: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than zero".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.provider_type == ProviderType::LocalCustom && self.endpoint.is_none() {
            return Err("local_custom provider requires an endpoint".to_string());
        }
        Ok(())
    }

    /// Explicit key, or the provider's conventional environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| match self.provider_type {
            ProviderType::OpenAI => std::env::var("OPENAI_API_KEY").ok(),
            _ => None,
        })
    }

    pub fn resolved_endpoint(&self) -> Option<String> {
        self.endpoint
            .clone()
            .or_else(|| self.provider_type.default_endpoint().map(str::to_string))
    }

    /// Build the configured service.
    pub fn create_client(&self) -> Result<Arc<dyn ModelService>, ApiError> {
        self.validate().map_err(ApiError::ProviderNotConfigured)?;
        let endpoint = self.resolved_endpoint().ok_or_else(|| {
            ApiError::ProviderNotConfigured(format!("No endpoint for provider {}", self.provider_type))
        })?;
        let api_key = self.resolved_api_key();
        if self.provider_type == ProviderType::OpenAI && api_key.is_none() {
            return Err(ApiError::ProviderNotConfigured(
                "openai provider requires api_key or OPENAI_API_KEY".to_string(),
            ));
        }
        let client = OpenAICompatibleClient::new(self.model.clone(), endpoint, api_key)?;
        Ok(Arc::new(client))
    }
}

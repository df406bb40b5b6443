//! Chat model clients
//!
//! Every provider is reached through the [`ChatModel`] trait. Handles are
//! built by the [`ModelResolver`](resolver::ModelResolver) from the user
//! config and a key rotation.

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod resolver;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub use resolver::{FallbackReason, ModelResolver, Resolution, ResolvedModel};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: 8192,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Concatenated system messages, if any
    pub(crate) fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

/// A callable model handle
#[async_trait]
pub trait ChatModel: Send + Sync + fmt::Debug {
    /// Provider name from the catalog
    fn provider(&self) -> &str;

    /// Model identifier sent to the provider
    fn model_id(&self) -> &str;

    /// Run a completion and return the text of the first choice
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Everything a provider client needs to be constructed
#[derive(Clone)]
pub struct ModelSpec {
    pub provider: String,
    pub model_id: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field(
                "api_key",
                &self.api_key.as_deref().map(crate::config::mask_key),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Provider(format!("Failed to create HTTP client: {}", e)))
}

/// Key required for a call, or an error naming where to configure it
pub(crate) fn require_key<'a>(provider: &str, key: &'a Option<String>) -> Result<&'a str> {
    key.as_deref().ok_or_else(|| {
        let env = crate::providers::find(provider)
            .map(|p| p.env_var)
            .unwrap_or("the provider's API key variable");
        Error::Provider(format!(
            "No API key configured for {}. Set {} or run `pixel-perfect config-key`",
            provider, env
        ))
    })
}

/// Strip credentials and noise from provider error bodies
pub(crate) fn sanitize_api_error(provider: &str, error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("apikey")
        || lower.contains("invalid key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("x-api-key")
    {
        return format!("{} authentication error. Please check your API key.", provider);
    }

    if lower.contains("rate limit") || lower.contains("quota") || lower.contains("overloaded") {
        return format!("{} rate limit exceeded. Please try again later.", provider);
    }

    if error.chars().count() > 300 {
        let head: String = error.chars().take(300).collect();
        format!("{}...(truncated)", head)
    } else {
        error.to_string()
    }
}

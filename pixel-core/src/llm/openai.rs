//! OpenAI-compatible chat completions client
//!
//! Serves mistral, openai, groq and deepseek, which all speak the
//! `/chat/completions` dialect.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{http_client, require_key, sanitize_api_error, ChatModel, ChatRequest, ModelSpec};
use crate::config::mask_key;
use crate::{Error, Result};

/// Base URL for an OpenAI-compatible provider
pub fn base_url(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("https://api.openai.com/v1"),
        "mistral" => Some("https://api.mistral.ai/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        _ => None,
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for one provider/model pair
pub struct OpenAiCompatible {
    client: Client,
    provider: String,
    model_id: String,
    api_key: Option<String>,
    base_url: String,
}

impl fmt::Debug for OpenAiCompatible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatible")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiCompatible {
    pub fn new(spec: ModelSpec) -> Result<Self> {
        let base_url = base_url(&spec.provider).ok_or_else(|| {
            Error::Provider(format!(
                "{} does not use the chat completions API",
                spec.provider
            ))
        })?;
        Ok(Self {
            client: http_client(spec.timeout)?,
            provider: spec.provider,
            model_id: spec.model_id,
            api_key: spec.api_key,
            base_url: base_url.to_string(),
        })
    }

    /// Point the client at a different server
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatible {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    #[instrument(skip(self, request), fields(provider = %self.provider, model = %self.model_id))]
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let key = require_key(&self.provider, &self.api_key)?;

        let body = CompletionBody {
            model: &self.model_id,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
        };

        debug!(messages = body.messages.len(), "Sending chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(sanitize_api_error(&self.provider, &e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(sanitize_api_error(
                &self.provider,
                &format!("HTTP {}: {}", status, text),
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| {
                Error::Provider(format!("Invalid response from {}: {}", self.provider, e))
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| Error::Provider(format!("{} returned no choices", self.provider)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spec(provider: &str, key: Option<&str>) -> ModelSpec {
        ModelSpec {
            provider: provider.to_string(),
            model_id: "m".to_string(),
            api_key: key.map(str::to_string),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_base_urls() {
        assert_eq!(base_url("mistral"), Some("https://api.mistral.ai/v1"));
        assert_eq!(base_url("groq"), Some("https://api.groq.com/openai/v1"));
        assert!(base_url("anthropic").is_none());
    }

    #[test]
    fn test_rejects_non_compatible_provider() {
        assert!(OpenAiCompatible::new(spec("google", Some("k"))).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_fails_at_call_time() {
        let client = OpenAiCompatible::new(spec("deepseek", None)).unwrap();
        let err = client
            .complete(&ChatRequest::new(vec![crate::llm::ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
    }

    #[test]
    fn test_debug_masks_key() {
        let client =
            OpenAiCompatible::new(spec("openai", Some("sk-abcdefghijklmnopqrstu"))).unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("ijklmnopq"));
    }

    #[test]
    fn test_body_shape() {
        let body = CompletionBody {
            model: "gpt-4o",
            messages: vec![WireMessage {
                role: "user",
                content: "hello",
            }],
            max_tokens: 10,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 10);
    }
}

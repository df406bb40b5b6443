//! Anthropic messages API client

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{
    http_client, require_key, sanitize_api_error, ChatModel, ChatRequest, ChatRole, ModelSpec,
};
use crate::config::mask_key;
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Claude client
pub struct AnthropicModel {
    client: Client,
    model_id: String,
    api_key: Option<String>,
    base_url: String,
}

impl fmt::Debug for AnthropicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicModel")
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnthropicModel {
    pub fn new(spec: ModelSpec) -> Result<Self> {
        Ok(Self {
            client: http_client(spec.timeout)?,
            model_id: spec.model_id,
            api_key: spec.api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    fn body<'a>(&'a self, request: &'a ChatRequest) -> MessagesBody<'a> {
        MessagesBody {
            model: &self.model_id,
            max_tokens: request.max_tokens,
            system: request.system_text(),
            messages: request
                .messages
                .iter()
                .filter(|m| m.role != ChatRole::System)
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ChatModel for AnthropicModel {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    #[instrument(skip(self, request), fields(model = %self.model_id))]
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let key = require_key("anthropic", &self.api_key)?;
        let body = self.body(request);

        debug!(messages = body.messages.len(), "Sending request to Anthropic");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(sanitize_api_error("anthropic", &e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(sanitize_api_error(
                "anthropic",
                &format!("HTTP {}: {}", status, text),
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Invalid response from anthropic: {}", e)))?;

        Ok(parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

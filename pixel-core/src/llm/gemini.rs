//! Google Gemini generateContent client

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

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Gemini client
pub struct GeminiModel {
    client: Client,
    model_id: String,
    api_key: Option<String>,
    base_url: String,
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiModel {
    pub fn new(spec: ModelSpec) -> Result<Self> {
        Ok(Self {
            client: http_client(spec.timeout)?,
            model_id: spec.model_id,
            api_key: spec.api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    fn body(request: &ChatRequest) -> GenerateBody {
        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| Content {
                role: Some(
                    match m.role {
                        ChatRole::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        GenerateBody {
            contents,
            system_instruction: request.system_text().map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    fn provider(&self) -> &str {
        "google"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    #[instrument(skip(self, request), fields(model = %self.model_id))]
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let key = require_key("google", &self.api_key)?;
        let body = Self::body(request);

        debug!(contents = body.contents.len(), "Sending request to Gemini");

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model_id
            ))
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            // reqwest errors carry the URL, which includes the key
            .map_err(|e| {
                Error::Provider(sanitize_api_error("google", &e.without_url().to_string()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(sanitize_api_error(
                "google",
                &format!("HTTP {}: {}", status, text),
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                Error::Provider(format!("Invalid response from google: {}", e.without_url()))
            })?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| Error::Provider("google returned no candidates".to_string()))?;

        Ok(candidate
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[test]
    fn test_body_maps_roles() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("sys"),
            ChatMessage::user("q"),
            ChatMessage::assistant("a"),
        ])
        .with_max_tokens(64);

        let json = serde_json::to_value(GeminiModel::body(&request)).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 64);
    }
}

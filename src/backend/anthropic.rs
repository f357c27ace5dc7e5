//! Anthropic Messages API provider.
//!
//! The persona travels in the top-level `system` field rather than as a
//! message, and the API requires strictly alternating `user`/`assistant` turns
//! beginning with `user` (see `History` trimming).

use super::{ChatProvider, GenerationParams, Turn, missing_field, post_json};
use crate::config::ResolvedBackend;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;

/// `anthropic-version` header value.
pub const API_VERSION: &str = "2023-06-01";

/// Client for `POST {base_url}/v1/messages`.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(client: reqwest::Client, resolved: &ResolvedBackend) -> Self {
        Self {
            client,
            api_key: resolved.api_key.clone(),
            model: resolved.model.clone(),
            base_url: resolved.base_url.clone(),
        }
    }
}

/// Build a Messages API request body.
pub fn build_request_body(
    model: &str,
    system: &str,
    turns: &[Turn],
    params: &GenerationParams,
) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = turns
        .iter()
        .map(|t| serde_json::json!({"role": t.role.as_str(), "content": t.text}))
        .collect();

    serde_json::json!({
        "model": model,
        "max_tokens": params.max_tokens,
        "system": system,
        "messages": messages,
        "temperature": params.temperature,
    })
}

/// Concatenate the `text` blocks of a Messages API response.
pub fn parse_reply(body: &serde_json::Value) -> Result<String> {
    let blocks = body
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| missing_field("Anthropic", "/content"))?;

    let text: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(missing_field("Anthropic", "/content/0/text"));
    }
    Ok(text.trim().to_owned())
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "Anthropic"
    }

    async fn complete(
        &self,
        system: &str,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(AssistantError::Backend("no API key configured".to_owned()));
        }
        let body = build_request_body(&self.model, system, turns, params);
        let url = format!("{}/v1/messages", self.base_url);
        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION);
        let reply = post_json(self.name(), request, &body).await?;
        parse_reply(&reply)
    }
}

//! OpenAI Chat Completions provider.

use super::{ChatProvider, GenerationParams, Turn, missing_field, post_json};
use crate::config::ResolvedBackend;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;

/// Client for `POST {base_url}/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, resolved: &ResolvedBackend) -> Self {
        Self {
            client,
            api_key: resolved.api_key.clone(),
            model: resolved.model.clone(),
            base_url: resolved.base_url.clone(),
        }
    }
}

/// Build a Chat Completions request body.
///
/// The persona goes first as a `system` message, followed by the history.
pub fn build_request_body(
    model: &str,
    system: &str,
    turns: &[Turn],
    params: &GenerationParams,
) -> serde_json::Value {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    messages.push(serde_json::json!({"role": "system", "content": system}));
    messages.extend(
        turns
            .iter()
            .map(|t| serde_json::json!({"role": t.role.as_str(), "content": t.text})),
    );

    serde_json::json!({
        "model": model,
        "messages": messages,
        "max_tokens": params.max_tokens,
        "temperature": params.temperature,
    })
}

/// Pull the reply text out of a Chat Completions response.
pub fn parse_reply(body: &serde_json::Value) -> Result<String> {
    const POINTER: &str = "/choices/0/message/content";
    body.pointer(POINTER)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_owned())
        .ok_or_else(|| missing_field("OpenAI", POINTER))
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "OpenAI"
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
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = self.client.post(&url).bearer_auth(&self.api_key);
        let reply = post_json(self.name(), request, &body).await?;
        parse_reply(&reply)
    }
}

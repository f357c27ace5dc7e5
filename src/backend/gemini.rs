//! Google Gemini `generateContent` provider.
//!
//! Gemini names the assistant role `model` and takes the persona as a
//! separate `system_instruction`.

use super::{ChatProvider, GenerationParams, Role, Turn, missing_field, post_json};
use crate::config::ResolvedBackend;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;

/// Client for `POST {base_url}/v1beta/models/{model}:generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, resolved: &ResolvedBackend) -> Self {
        Self {
            client,
            api_key: resolved.api_key.clone(),
            model: resolved.model.clone(),
            base_url: resolved.base_url.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        )
    }
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

/// Build a `generateContent` request body.
pub fn build_request_body(
    system: &str,
    turns: &[Turn],
    params: &GenerationParams,
) -> serde_json::Value {
    let contents: Vec<serde_json::Value> = turns
        .iter()
        .map(|t| {
            serde_json::json!({
                "role": gemini_role(t.role),
                "parts": [{"text": t.text}],
            })
        })
        .collect();

    serde_json::json!({
        "system_instruction": {"parts": [{"text": system}]},
        "contents": contents,
        "generationConfig": {
            "maxOutputTokens": params.max_tokens,
            "temperature": params.temperature,
        },
    })
}

/// Concatenate the text parts of the first candidate.
pub fn parse_reply(body: &serde_json::Value) -> Result<String> {
    const POINTER: &str = "/candidates/0/content/parts";
    let parts = body
        .pointer(POINTER)
        .and_then(|p| p.as_array())
        .ok_or_else(|| missing_field("Gemini", POINTER))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(missing_field("Gemini", "/candidates/0/content/parts/0/text"));
    }
    Ok(text.trim().to_owned())
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
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
        let body = build_request_body(system, turns, params);
        let request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key);
        let reply = post_json(self.name(), request, &body).await?;
        parse_reply(&reply)
    }
}

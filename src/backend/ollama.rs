//! Local Ollama provider (`/api/chat`, non-streaming).

use super::{ChatProvider, GenerationParams, Turn, missing_field, post_json};
use crate::config::ResolvedBackend;
use crate::error::Result;
use async_trait::async_trait;

/// Client for `POST {base_url}/api/chat`.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(client: reqwest::Client, resolved: &ResolvedBackend) -> Self {
        Self {
            client,
            model: resolved.model.clone(),
            base_url: resolved.base_url.clone(),
        }
    }
}

/// Build an `/api/chat` request body.
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
        "stream": false,
        "options": {
            "num_predict": params.max_tokens,
            "temperature": params.temperature,
        },
    })
}

pub fn parse_reply(body: &serde_json::Value) -> Result<String> {
    const POINTER: &str = "/message/content";
    body.pointer(POINTER)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_owned())
        .ok_or_else(|| missing_field("Ollama", POINTER))
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    fn failure_hint(&self) -> Option<&'static str> {
        Some(". Is Ollama running?")
    }

    async fn complete(
        &self,
        system: &str,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<String> {
        let body = build_request_body(&self.model, system, turns, params);
        let url = format!("{}/api/chat", self.base_url);
        let reply = post_json(self.name(), self.client.post(&url), &body).await?;
        parse_reply(&reply)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn body_disables_streaming() {
        let body = build_request_body(
            "llama3.2",
            "persona",
            &[Turn::user("hi")],
            &GenerationParams::default(),
        );
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 150);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[test]
    fn parse_reply_reads_message_content() {
        let body = serde_json::json!({"message": {"role": "assistant", "content": "Fine."}, "done": true});
        assert_eq!(parse_reply(&body).unwrap(), "Fine.");
        let padded = serde_json::json!({"message": {"content": "\n  Fine, Sir.  \n"}});
        assert_eq!(parse_reply(&padded).unwrap(), "Fine, Sir.");
        let empty = serde_json::json!({"message": {"content": ""}});
        assert_eq!(parse_reply(&empty).unwrap(), "");
        assert!(parse_reply(&serde_json::json!({"done": true})).is_err());
    }
}

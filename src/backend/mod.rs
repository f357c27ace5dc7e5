//! Conversational backends for utterances no built-in intent handles.
//!
//! Every provider is wrapped in a [`ChatSession`], which owns the turn
//! history, prepends the persona on every exchange, and turns transport
//! failures into reply text:
//!
//! ```text
//! chat("tell me a joke")
//!   → provider.complete(system prompt, history + user turn, limits)
//!   → Ok(reply)  : history += user turn, assistant turn; return reply
//!   → Err(e)     : history unchanged, return "Error with {Provider}: {e}"
//! ```
//!
//! History only changes once a reply arrives, so an exchange that fails or
//! is cancelled mid-request never leaves a dangling user turn.
//!
//! The provider is picked once, at construction, by [`from_config`].

mod anthropic;
mod gemini;
mod ollama;
mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::{BackendConfig, BackendProvider, ResolvedBackend};
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// The capability the dispatcher delegates unmatched utterances to.
#[async_trait]
pub trait ConversationBackend: Send {
    /// Provider name for logging.
    fn provider_name(&self) -> &str;

    /// Send one user message and return the reply.
    ///
    /// Built-in providers never return `Err`; a failed exchange comes back as
    /// reply text. Custom implementations may fail, in which case the
    /// dispatcher reports the error itself.
    async fn chat(&mut self, message: &str) -> Result<String>;
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name shared by the OpenAI, Anthropic, and Ollama APIs.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of a backend's conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered user/assistant history with an optional size cap.
#[derive(Debug, Clone, Default)]
pub struct History {
    turns: Vec<Turn>,
    /// `0` keeps every turn.
    max_messages: usize,
}

impl History {
    pub fn new(max_messages: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_messages,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.trim();
    }

    /// The turns as they would be after pushing `turn`, without committing it.
    fn with_pending(&self, turn: Turn) -> Vec<Turn> {
        let mut next = self.clone();
        next.push(turn);
        next.turns
    }

    fn trim(&mut self) {
        if self.max_messages == 0 || self.turns.len() <= self.max_messages {
            return;
        }
        let excess = self.turns.len() - self.max_messages;
        self.turns.drain(..excess);
        // Providers with strict alternation reject a leading assistant turn.
        while self.turns.first().is_some_and(|t| t.role == Role::Assistant) {
            self.turns.remove(0);
        }
    }
}

/// Output limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.8,
        }
    }
}

impl From<&ResolvedBackend> for GenerationParams {
    fn from(resolved: &ResolvedBackend) -> Self {
        Self {
            max_tokens: resolved.max_tokens,
            temperature: resolved.temperature,
        }
    }
}

/// Transport for a single chat provider.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name as shown to the user (`"OpenAI"`, `"Ollama"`, ...).
    fn name(&self) -> &'static str;

    /// Extra advice appended to failure replies.
    fn failure_hint(&self) -> Option<&'static str> {
        None
    }

    /// Request a completion for `turns` (ending with the new user turn).
    ///
    /// The reply is the model's text with surrounding whitespace trimmed;
    /// nothing else about it is altered. An empty string is a valid reply.
    async fn complete(
        &self,
        system: &str,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<String>;
}

/// A provider plus the conversation held with it.
pub struct ChatSession<P> {
    provider: P,
    system_prompt: String,
    history: History,
    params: GenerationParams,
}

impl<P: ChatProvider> ChatSession<P> {
    /// Create a session using the assistant persona.
    pub fn new(provider: P, params: GenerationParams, max_history_messages: usize) -> Self {
        Self {
            provider,
            system_prompt: crate::persona::SYSTEM_PROMPT.to_owned(),
            history: History::new(max_history_messages),
            params,
        }
    }

    /// Replace the system instruction.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P: ChatProvider> ConversationBackend for ChatSession<P> {
    fn provider_name(&self) -> &str {
        self.provider.name()
    }

    async fn chat(&mut self, message: &str) -> Result<String> {
        let turns = self.history.with_pending(Turn::user(message));
        let started = Instant::now();

        let result = self
            .provider
            .complete(&self.system_prompt, &turns, &self.params)
            .await;

        match result {
            Ok(reply) => {
                info!(
                    provider = self.provider.name(),
                    "reply in {}ms ({} history messages)",
                    started.elapsed().as_millis(),
                    turns.len() + 1
                );
                self.history.push(Turn::user(message));
                self.history.push(Turn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                error!(provider = self.provider.name(), "chat request failed: {e}");
                Ok(format!(
                    "Error with {}: {}{}",
                    self.provider.name(),
                    failure_detail(&e),
                    self.provider.failure_hint().unwrap_or_default()
                ))
            }
        }
    }
}

/// Strip the variant prefix so replies read `Error with X: <what went wrong>`.
fn failure_detail(e: &AssistantError) -> String {
    match e {
        AssistantError::Backend(detail) => detail.clone(),
        other => other.to_string(),
    }
}

/// Build the backend chosen by `config`.
///
/// # Errors
///
/// Returns [`AssistantError::Config`] when the provider's credential or model
/// cannot be resolved, or the HTTP client cannot be built.
pub fn from_config(config: &BackendConfig) -> Result<Box<dyn ConversationBackend>> {
    let resolved = config.resolve()?;
    from_resolved(&resolved)
}

/// Build a backend from already-resolved connection details.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn from_resolved(resolved: &ResolvedBackend) -> Result<Box<dyn ConversationBackend>> {
    let client = http_client(resolved.timeout)?;
    let params = GenerationParams::from(resolved);
    let max = resolved.max_history_messages;

    info!(
        "chat backend: {} model={} url={}",
        resolved.provider.display_name(),
        resolved.model,
        resolved.base_url
    );

    let backend: Box<dyn ConversationBackend> = match resolved.provider {
        BackendProvider::OpenAi => Box::new(ChatSession::new(
            OpenAiProvider::new(client, resolved),
            params,
            max,
        )),
        BackendProvider::Anthropic => Box::new(ChatSession::new(
            AnthropicProvider::new(client, resolved),
            params,
            max,
        )),
        BackendProvider::Gemini => Box::new(ChatSession::new(
            GeminiProvider::new(client, resolved),
            params,
            max,
        )),
        BackendProvider::Ollama => Box::new(ChatSession::new(
            OllamaProvider::new(client, resolved),
            params,
            max,
        )),
    };
    Ok(backend)
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AssistantError::Config(format!("failed to build HTTP client: {e}")))
}

// ── HTTP helpers shared by the providers ───────────────────────

/// POST `body` and return the parsed JSON reply.
///
/// `request` carries the URL and any provider-specific headers.
pub(crate) async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    debug!("sending request to {provider}");
    let response = request
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read body".into());
        error!(status = %status, body = %body, "{provider} request returned error");
        return Err(map_http_error(status, &body));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| AssistantError::Backend(format!("invalid response body: {e}")))
}

/// Map an HTTP error status and body to a backend error.
pub(crate) fn map_http_error(status: reqwest::StatusCode, body: &str) -> AssistantError {
    let detail = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => AssistantError::Backend(format!("authentication failed: {detail}")),
        429 => AssistantError::Backend(format!("rate limit exceeded: {detail}")),
        404 => AssistantError::Backend(format!("not found: {detail}")),
        529 => AssistantError::Backend(format!("API overloaded: {detail}")),
        _ => AssistantError::Backend(format!("HTTP {status}: {detail}")),
    }
}

/// Pull a human-readable message out of a provider error body.
///
/// OpenAI, Anthropic, and Gemini nest it under `error.message`; Ollama uses a
/// top-level `error` string.
pub(crate) fn extract_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body.chars().take(500).collect()
            }
        })
}

pub(crate) fn transport_error(e: reqwest::Error) -> AssistantError {
    if e.is_timeout() {
        AssistantError::Backend(format!("request timed out: {e}"))
    } else {
        AssistantError::Backend(format!("connection error: {e}"))
    }
}

pub(crate) fn missing_field(provider: &str, pointer: &str) -> AssistantError {
    AssistantError::Backend(format!("{provider} response missing {pointer}"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::sync::{Arc, Mutex};

    /// Provider double that records what it was sent.
    struct Scripted {
        replies: Mutex<Vec<Result<String>>>,
        seen: Arc<Mutex<Vec<(String, Vec<Turn>)>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String>>) -> (Self, Arc<Mutex<Vec<(String, Vec<Turn>)>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let mut replies = replies;
            replies.reverse();
            (
                Self {
                    replies: Mutex::new(replies),
                    seen: Arc::clone(&seen),
                },
                seen,
            )
        }
    }

    #[async_trait]
    impl ChatProvider for Scripted {
        fn name(&self) -> &'static str {
            "Scripted"
        }

        fn failure_hint(&self) -> Option<&'static str> {
            Some(". Is it plugged in?")
        }

        async fn complete(
            &self,
            system: &str,
            turns: &[Turn],
            _params: &GenerationParams,
        ) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_owned(), turns.to_vec()));
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("(no script)".to_owned()))
        }
    }

    #[tokio::test]
    async fn history_grows_and_is_resent() {
        let (provider, seen) = Scripted::new(vec![Ok("one".into()), Ok("two".into())]);
        let mut session = ChatSession::new(provider, GenerationParams::default(), 0);

        assert_eq!(session.chat("first").await.unwrap(), "one");
        assert_eq!(session.chat("second").await.unwrap(), "two");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].1, vec![Turn::user("first")]);
        assert_eq!(
            seen[1].1,
            vec![
                Turn::user("first"),
                Turn::assistant("one"),
                Turn::user("second")
            ]
        );
        assert!(seen[1].0.starts_with("You are JAVA"));
        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn failure_becomes_reply_text_and_rolls_back_turn() {
        let (provider, _) = Scripted::new(vec![Err(AssistantError::Backend(
            "connection refused".into(),
        ))]);
        let mut session = ChatSession::new(provider, GenerationParams::default(), 0);

        let reply = session.chat("anyone there?").await.unwrap();
        assert_eq!(
            reply,
            "Error with Scripted: connection refused. Is it plugged in?"
        );
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn custom_system_prompt_is_sent() {
        let (provider, seen) = Scripted::new(vec![Ok("ok".into())]);
        let mut session =
            ChatSession::new(provider, GenerationParams::default(), 0).with_system_prompt("Be brief.");
        session.chat("hi").await.unwrap();
        assert_eq!(seen.lock().unwrap()[0].0, "Be brief.");
    }

    /// Provider whose request never completes.
    struct Hanging;

    #[async_trait]
    impl ChatProvider for Hanging {
        fn name(&self) -> &'static str {
            "Hanging"
        }

        async fn complete(
            &self,
            _system: &str,
            _turns: &[Turn],
            _params: &GenerationParams,
        ) -> Result<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancelled_exchange_leaves_history_untouched() {
        let mut session = ChatSession::new(Hanging, GenerationParams::default(), 0);
        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), session.chat("still there?")).await;
        assert!(cancelled.is_err());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn capped_history_is_applied_to_the_request() {
        let (provider, seen) = Scripted::new(vec![Ok("one".into()), Ok("two".into())]);
        let mut session = ChatSession::new(provider, GenerationParams::default(), 2);
        session.chat("first").await.unwrap();
        session.chat("second").await.unwrap();

        // [first, one, second] capped to [one, second], then the leading
        // assistant turn is dropped.
        assert_eq!(seen.lock().unwrap()[1].1, vec![Turn::user("second")]);
        assert_eq!(
            session.history().turns(),
            [Turn::user("second"), Turn::assistant("two")]
        );
    }

    #[test]
    fn capped_history_keeps_recent_turns_starting_with_user() {
        let mut history = History::new(3);
        history.push(Turn::user("a"));
        history.push(Turn::assistant("b"));
        history.push(Turn::user("c"));
        history.push(Turn::assistant("d"));
        // Cap leaves [b, c, d]; the leading assistant turn is dropped too.
        assert_eq!(history.turns(), [Turn::user("c"), Turn::assistant("d")]);
    }

    #[test]
    fn zero_cap_is_unbounded() {
        let mut history = History::new(0);
        for i in 0..100 {
            history.push(Turn::user(format!("{i}")));
        }
        assert_eq!(history.len(), 100);
    }

    #[test]
    fn extract_error_message_variants() {
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"bad key"}}"#),
            "bad key"
        );
        assert_eq!(
            extract_error_message(r#"{"error":"model 'x' not found"}"#),
            "model 'x' not found"
        );
        assert_eq!(extract_error_message(""), "no response body");
        assert_eq!(extract_error_message("plain"), "plain");
    }

    #[test]
    fn map_http_error_names_common_statuses() {
        let auth = map_http_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"invalid x-api-key"}}"#,
        );
        assert_eq!(
            auth.to_string(),
            "backend error: authentication failed: invalid x-api-key"
        );
        let other = map_http_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(other.to_string().contains("HTTP 502 Bad Gateway: upstream down"));
    }

    #[test]
    fn from_config_builds_each_provider() {
        for provider in BackendProvider::all() {
            let config = BackendConfig {
                api_key: Some("test-key".into()),
                ..BackendConfig::for_provider(*provider)
            };
            let backend = from_config(&config).unwrap();
            assert_eq!(backend.provider_name(), provider.display_name());
        }
    }
}

//! Turns an utterance into an [`Outcome`].
//!
//! Built-in intents are answered locally; privileged ones (websites, apps)
//! are checked against the allowlist first. Everything else goes to the
//! conversational backend. Failures never escape: they come back as
//! response text and the session keeps listening.

use crate::actions::HostActions;
use crate::allowlist::{AllowlistStore, normalize_url};
use crate::backend::ConversationBackend;
use crate::intent::{self, Intent};
use crate::persona;
use std::sync::Arc;
use tracing::{info, warn};

/// Page opened by the "open browser" intent.
pub const BROWSER_HOME: &str = "http://www.google.com";
const SEARCH_URL: &str = "https://www.google.com/search?q=";

/// A side effect the dispatcher carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    OpenedUrl(String),
    LaunchedApp(String),
}

/// Result of dispatching one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Blank input or a blank backend reply; nothing is said.
    Silent,
    /// Answered locally, no side effect.
    Direct(String),
    /// A side effect succeeded.
    Performed { effect: SideEffect, response: String },
    /// Non-blank reply from the conversational backend, unmodified.
    Backend(String),
    /// End the session after saying the farewell.
    Terminate(String),
}

impl Outcome {
    /// Text to speak, if any.
    pub fn response(&self) -> Option<&str> {
        match self {
            Outcome::Silent => None,
            Outcome::Direct(text)
            | Outcome::Backend(text)
            | Outcome::Terminate(text)
            | Outcome::Performed { response: text, .. } => Some(text),
        }
    }

    pub fn is_terminate(&self) -> bool {
        matches!(self, Outcome::Terminate(_))
    }
}

/// Routes utterances to local handlers or the backend.
pub struct Dispatcher {
    allowlist: AllowlistStore,
    host: Arc<dyn HostActions>,
    backend: Box<dyn ConversationBackend>,
}

impl Dispatcher {
    pub fn new(
        allowlist: AllowlistStore,
        host: Arc<dyn HostActions>,
        backend: Box<dyn ConversationBackend>,
    ) -> Self {
        Self {
            allowlist,
            host,
            backend,
        }
    }

    pub fn allowlist(&self) -> &AllowlistStore {
        &self.allowlist
    }

    /// Dispatch one raw utterance.
    pub async fn dispatch(&mut self, raw: &str) -> Outcome {
        let normalized = intent::normalize(raw);
        let Some(intent) = intent::classify(&normalized) else {
            return Outcome::Silent;
        };

        match intent {
            Intent::Greeting => Outcome::Direct(persona::greeting().to_owned()),
            Intent::Farewell => Outcome::Terminate(persona::farewell().to_owned()),
            Intent::CurrentTime => Outcome::Direct(time_reply(chrono::Local::now())),
            Intent::CurrentDate => Outcome::Direct(date_reply(chrono::Local::now())),
            Intent::OpenBrowser => self.open_url(
                BROWSER_HOME,
                "Opening your browser. Try not to get lost.".to_owned(),
            ),
            Intent::Search { query: None } => {
                Outcome::Direct("Search for what, exactly?".to_owned())
            }
            Intent::Search { query: Some(query) } => {
                let url = format!("{SEARCH_URL}{}", urlencoding::encode(&query));
                self.open_url(&url, format!("Searching for '{query}'. Riveting stuff."))
            }
            Intent::OpenWebsite { target } => self.open_website(&target),
            Intent::LaunchApp { name: None } => {
                Outcome::Direct("Open what? I need a specific application name.".to_owned())
            }
            Intent::LaunchApp { name: Some(name) } => self.launch_app(&name),
            Intent::SystemInfo => Outcome::Direct(format!(
                "You're running {}. Thrilling, isn't it?",
                self.host.system_description()
            )),
            Intent::Converse => self.converse(raw).await,
        }
    }

    fn open_url(&self, url: &str, response: String) -> Outcome {
        match self.host.open_url(url) {
            Ok(()) => Outcome::Performed {
                effect: SideEffect::OpenedUrl(url.to_owned()),
                response,
            },
            Err(e) => {
                warn!("failed to open {url}: {e}");
                Outcome::Direct(format!("I couldn't open {url}. Error: {e}"))
            }
        }
    }

    fn open_website(&self, target: &str) -> Outcome {
        let url = normalize_url(target);
        if !self.allowlist.is_website_allowed(&url) {
            info!("website denied by allowlist: {url}");
            return Outcome::Direct(format!(
                "Access to {url} is restricted. Use 'java-add --site {url}' to allow it."
            ));
        }
        let response = format!("Opening {url}. Hope you know what you're doing.");
        self.open_url(&url, response)
    }

    fn launch_app(&self, name: &str) -> Outcome {
        if !self.allowlist.is_application_allowed(name) {
            info!("application denied by allowlist: {name}");
            return Outcome::Direct(format!(
                "I'm not authorized to open '{name}'. Use 'java-add --app \"{name}\"' to add it to the allowlist."
            ));
        }
        match self.host.launch_app(name) {
            Ok(()) => Outcome::Performed {
                effect: SideEffect::LaunchedApp(name.to_owned()),
                response: format!("Opening {name}. Hope you know what you're doing."),
            },
            Err(e) => {
                warn!("failed to launch {name}: {e}");
                Outcome::Direct(format!(
                    "I can't find {name}. Perhaps check your spelling? Error: {e}"
                ))
            }
        }
    }

    async fn converse(&mut self, raw: &str) -> Outcome {
        match self.backend.chat(raw).await {
            Ok(reply) if reply.trim().is_empty() => {
                warn!(provider = self.backend.provider_name(), "backend returned an empty reply");
                Outcome::Silent
            }
            Ok(reply) => Outcome::Backend(reply),
            Err(e) => {
                warn!(provider = self.backend.provider_name(), "backend failed: {e}");
                Outcome::Direct(format!("My circuits are malfunctioning. Error: {e}"))
            }
        }
    }
}

/// `It's 03:07 PM. You couldn't check your watch?`
pub fn time_reply<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("It's {}. You couldn't check your watch?", now.format("%I:%M %p"))
}

/// `Today is March 05, 2026. Fascinating, isn't it?`
pub fn date_reply<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Today is {}. Fascinating, isn't it?", now.format("%B %d, %Y"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use chrono::TimeZone;

    #[test]
    fn time_reply_uses_twelve_hour_clock() {
        let t = chrono::Utc.with_ymd_and_hms(2026, 3, 5, 15, 7, 0).unwrap();
        assert_eq!(time_reply(t), "It's 03:07 PM. You couldn't check your watch?");
    }

    #[test]
    fn date_reply_spells_month() {
        let t = chrono::Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
        assert_eq!(
            date_reply(t),
            "Today is March 05, 2026. Fascinating, isn't it?"
        );
    }

    #[test]
    fn outcome_response_text() {
        assert_eq!(Outcome::Silent.response(), None);
        let done = Outcome::Performed {
            effect: SideEffect::LaunchedApp("vim".into()),
            response: "ok".into(),
        };
        assert_eq!(done.response(), Some("ok"));
        assert!(Outcome::Terminate("bye".into()).is_terminate());
        assert!(!done.is_terminate());
    }
}

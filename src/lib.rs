//! Java-the-hud: a sarcastic voice assistant core.
//!
//! Each utterance flows through a fixed pipeline:
//! Speech input → Session → Dispatcher → (Allowlist | Backend) → Speech output
//!
//! # Architecture
//!
//! - **Intent**: ordered keyword rules that recognize built-in commands
//! - **Dispatcher**: answers built-ins, gates websites and apps through the
//!   allowlist, and hands everything else to the chat backend
//! - **Backend**: OpenAI, Anthropic, Gemini, or a local Ollama server, chosen
//!   once from configuration
//! - **Session**: the Idle → Listening → Processing → Speaking loop, driven by
//!   pluggable speech input/output collaborators
//!
//! Real speech-to-text and text-to-speech engines are out of scope; the
//! [`console`] module provides terminal stand-ins.

pub mod actions;
pub mod allowlist;
pub mod backend;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod hud_dirs;
pub mod intent;
pub mod logging;
pub mod persona;
pub mod session;
pub mod speech;

pub use allowlist::{Allowlist, AllowlistStore, EntryKind};
pub use backend::ConversationBackend;
pub use config::{AssistantConfig, BackendConfig, BackendProvider};
pub use dispatch::{Dispatcher, Outcome, SideEffect};
pub use error::{AssistantError, Result};
pub use intent::Intent;
pub use session::{Session, SessionState};
pub use speech::{SpeechCompletion, SpeechInput, SpeechOutput};

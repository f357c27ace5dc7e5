//! Error types for the assistant core.

/// Top-level error type for the voice assistant.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Configuration error (missing credential, model, or malformed file).
    #[error("config error: {0}")]
    Config(String),

    /// Allowlist document could not be read, parsed, or written.
    #[error("allowlist error: {0}")]
    Allowlist(String),

    /// Conversational backend transport or protocol error.
    #[error("backend error: {0}")]
    Backend(String),

    /// Speech input/output collaborator error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Side-effecting action (browser, process launch) failed.
    #[error("action error: {0}")]
    Action(String),

    /// Session lifecycle misuse (e.g. starting twice).
    #[error("session error: {0}")]
    Session(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;

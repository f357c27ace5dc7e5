//! Configuration types for the assistant.
//!
//! Loaded from `config.toml` (see [`AssistantConfig::default_config_path`]);
//! every section falls back to defaults for missing fields.

use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Conversational backend settings.
    pub backend: BackendConfig,
    /// Allowlist document location.
    pub allowlist: AllowlistConfig,
    /// Session loop timing.
    pub session: SessionConfig,
    /// Console speech collaborator settings.
    pub speech: SpeechConfig,
}

/// Which chat provider backs unmatched utterances.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// OpenAI chat completions API.
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Google Gemini `generateContent` API.
    Gemini,
    /// Local Ollama server.
    #[default]
    Ollama,
}

impl BackendProvider {
    /// Return all provider variants.
    pub fn all() -> &'static [BackendProvider] {
        &[
            BackendProvider::OpenAi,
            BackendProvider::Anthropic,
            BackendProvider::Gemini,
            BackendProvider::Ollama,
        ]
    }

    /// Human-facing provider name, used in backend error replies.
    pub fn display_name(self) -> &'static str {
        match self {
            BackendProvider::OpenAi => "OpenAI",
            BackendProvider::Anthropic => "Anthropic",
            BackendProvider::Gemini => "Gemini",
            BackendProvider::Ollama => "Ollama",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            BackendProvider::OpenAi => "gpt-4",
            BackendProvider::Anthropic => "claude-3-5-sonnet-20241022",
            BackendProvider::Gemini => "gemini-2.0-flash-exp",
            BackendProvider::Ollama => "llama3.2",
        }
    }

    /// API base URL used when none is configured.
    pub fn default_base_url(self) -> &'static str {
        match self {
            BackendProvider::OpenAi => "https://api.openai.com",
            BackendProvider::Anthropic => "https://api.anthropic.com",
            BackendProvider::Gemini => "https://generativelanguage.googleapis.com",
            BackendProvider::Ollama => "http://localhost:11434",
        }
    }

    /// Environment variable consulted for the credential, if the provider needs one.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            BackendProvider::OpenAi => Some("OPENAI_API_KEY"),
            BackendProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            BackendProvider::Gemini => Some("GOOGLE_API_KEY"),
            BackendProvider::Ollama => None,
        }
    }
}

impl fmt::Display for BackendProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendProvider::OpenAi => "openai",
            BackendProvider::Anthropic => "anthropic",
            BackendProvider::Gemini => "gemini",
            BackendProvider::Ollama => "ollama",
        };
        f.write_str(s)
    }
}

impl FromStr for BackendProvider {
    type Err = AssistantError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt" | "1" => Ok(BackendProvider::OpenAi),
            "anthropic" | "claude" | "2" => Ok(BackendProvider::Anthropic),
            "gemini" | "google" | "3" => Ok(BackendProvider::Gemini),
            "ollama" | "local" | "4" => Ok(BackendProvider::Ollama),
            other => Err(AssistantError::Config(format!(
                "unknown backend provider: {other:?}"
            ))),
        }
    }
}

/// Conversational backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Provider to talk to.
    pub provider: BackendProvider,
    /// Credential. When absent, the provider's environment variable is used.
    pub api_key: Option<String>,
    /// Model identifier (provider default when absent).
    pub model: Option<String>,
    /// Endpoint base URL (provider default when absent).
    pub base_url: Option<String>,
    /// Maximum output tokens per reply.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum history messages kept per backend session. `0` keeps everything.
    pub max_history_messages: usize,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: BackendProvider::default(),
            api_key: None,
            model: None,
            base_url: None,
            max_tokens: 150,
            temperature: 0.8,
            max_history_messages: 0,
            timeout_secs: 60,
        }
    }
}

/// Connection details after defaults and credentials have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBackend {
    pub provider: BackendProvider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub max_history_messages: usize,
    pub timeout: Duration,
}

impl BackendConfig {
    /// Create a config for `provider` with every other field defaulted.
    pub fn for_provider(provider: BackendProvider) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    /// Resolve defaults and the credential.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] when the provider needs a credential
    /// and none is configured or exported, when the model or base URL is
    /// blank, or when the generation limits are out of range.
    pub fn resolve(&self) -> Result<ResolvedBackend> {
        let provider = self.provider;

        let model = match self.model.as_deref() {
            Some(m) if m.trim().is_empty() => {
                return Err(AssistantError::Config(format!(
                    "{provider} backend has an empty model"
                )));
            }
            Some(m) => m.trim().to_owned(),
            None => provider.default_model().to_owned(),
        };

        let base_url = match self.base_url.as_deref() {
            Some(u) if u.trim().is_empty() => {
                return Err(AssistantError::Config(format!(
                    "{provider} backend has an empty base_url"
                )));
            }
            Some(u) => u.trim().trim_end_matches('/').to_owned(),
            None => provider.default_base_url().to_owned(),
        };

        let api_key = self.resolve_api_key()?;

        if self.max_tokens == 0 {
            return Err(AssistantError::Config(
                "backend max_tokens must be greater than zero".to_owned(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AssistantError::Config(format!(
                "backend temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }

        Ok(ResolvedBackend {
            provider,
            api_key,
            model,
            base_url,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            max_history_messages: self.max_history_messages,
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        })
    }

    fn resolve_api_key(&self) -> Result<String> {
        let Some(var) = self.provider.api_key_env() else {
            return Ok(self.api_key.clone().unwrap_or_default());
        };

        if let Some(key) = self.api_key.as_deref()
            && !key.trim().is_empty()
        {
            return Ok(key.trim().to_owned());
        }

        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
            _ => Err(AssistantError::Config(format!(
                "{} backend needs an API key: set backend.api_key or export {var}",
                self.provider.display_name()
            ))),
        }
    }
}

/// Allowlist location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowlistConfig {
    /// Path of the JSON allowlist document.
    pub path: PathBuf,
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            path: crate::hud_dirs::allowlist_file(),
        }
    }
}

/// Session loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between `is_playing` polls while waiting for speech to finish.
    pub speech_poll_interval_ms: u64,
    /// Upper bound on a single wait for speech completion.
    pub speech_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            speech_poll_interval_ms: 100,
            speech_timeout_secs: 120,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.speech_poll_interval_ms.max(1))
    }

    pub fn speech_timeout(&self) -> Duration {
        Duration::from_secs(self.speech_timeout_secs)
    }
}

/// Console speech collaborator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Text-to-speech command (`say` on macOS, `espeak` elsewhere when unset).
    pub voice_command: Option<String>,
}

impl AssistantConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AssistantError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AssistantError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::hud_dirs::config_file()
    }

    /// Check that an assistant can be built from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] for the problems
    /// [`BackendConfig::resolve`] reports.
    pub fn validate(&self) -> Result<()> {
        self.backend.resolve().map(|_| ())
    }

    /// Load `path` if given, else the default file when it exists, else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file exists but cannot be read or parsed.
    /// An explicitly given path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_config_path();
                if default.is_file() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

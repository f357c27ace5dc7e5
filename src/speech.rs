//! Speech collaborator seams.
//!
//! Capture and playback are external; the session only needs these traits.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Callback receiving incremental transcription text.
pub type TranscriptSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Produces transcribed utterances.
pub trait SpeechInput: Send + Sync {
    /// Block until one utterance has been captured and transcribed.
    ///
    /// May return an empty string when nothing intelligible was heard.
    fn capture_utterance(&self) -> Result<String>;

    /// Ask an in-flight or future capture to return promptly.
    fn request_stop(&self);

    /// Register a callback for partial transcripts. Ignored by default.
    fn set_partial_transcript_sink(&self, _sink: TranscriptSink) {}
}

/// Speaks responses.
pub trait SpeechOutput: Send + Sync {
    /// Begin speaking `text`. Returns once playback has started.
    fn speak(&self, text: &str) -> Result<()>;

    /// Whether playback is still in progress.
    fn is_playing(&self) -> bool;

    /// Halt playback.
    fn request_stop(&self);
}

/// Waits for a [`SpeechOutput`] to finish.
#[async_trait]
pub trait SpeechCompletion: Send + Sync {
    async fn await_speech_done(&self, output: &dyn SpeechOutput);
}

/// Polls [`SpeechOutput::is_playing`] at a fixed interval.
#[derive(Debug, Clone, Copy)]
pub struct PollingCompletion {
    pub interval: Duration,
    /// Give up after this long. `Duration::ZERO` waits forever.
    pub timeout: Duration,
}

impl Default for PollingCompletion {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(120),
        }
    }
}

impl PollingCompletion {
    pub fn from_config(config: &crate::config::SessionConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.speech_timeout(),
        }
    }
}

#[async_trait]
impl SpeechCompletion for PollingCompletion {
    async fn await_speech_done(&self, output: &dyn SpeechOutput) {
        let started = Instant::now();
        while output.is_playing() {
            if !self.timeout.is_zero() && started.elapsed() >= self.timeout {
                warn!(
                    "speech still playing after {}s, continuing",
                    self.timeout.as_secs()
                );
                return;
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

//! In-memory collaborators shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use java_hud::actions::HostActions;
use java_hud::backend::ConversationBackend;
use java_hud::error::{AssistantError, Result};
use java_hud::speech::{SpeechInput, SpeechOutput, TranscriptSink};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Records every URL and app launch instead of touching the system.
#[derive(Default)]
pub struct FakeHost {
    pub opened: Mutex<Vec<String>>,
    pub launched: Mutex<Vec<String>>,
    pub fail_launch: bool,
}

impl FakeHost {
    pub fn failing_launches() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

impl HostActions for FakeHost {
    fn open_url(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_owned());
        Ok(())
    }

    fn launch_app(&self, name: &str) -> Result<()> {
        if self.fail_launch {
            return Err(AssistantError::Action(format!("{name}: cannot find binary path")));
        }
        self.launched.lock().unwrap().push(name.to_owned());
        Ok(())
    }

    fn system_description(&self) -> String {
        "TestOS 1.0".to_owned()
    }
}

/// Backend that echoes, or fails when told to.
#[derive(Clone, Default)]
pub struct EchoBackend {
    pub received: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
    /// Fixed reply used instead of the echo.
    pub reply: Option<String>,
}

impl EchoBackend {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_owned()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ConversationBackend for EchoBackend {
    fn provider_name(&self) -> &str {
        "Echo"
    }

    async fn chat(&mut self, message: &str) -> Result<String> {
        self.received.lock().unwrap().push(message.to_owned());
        match (&self.fail_with, &self.reply) {
            (Some(reason), _) => Err(AssistantError::Backend(reason.clone())),
            (None, Some(reply)) => Ok(reply.clone()),
            (None, None) => Ok(format!("echo: {message}")),
        }
    }
}

/// Backend whose replies never arrive.
#[derive(Clone, Default)]
pub struct StalledBackend {
    pub received: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ConversationBackend for StalledBackend {
    fn provider_name(&self) -> &str {
        "Stalled"
    }

    async fn chat(&mut self, message: &str) -> Result<String> {
        self.received.lock().unwrap().push(message.to_owned());
        std::future::pending().await
    }
}

/// Hands out scripted utterances, then blocks until stopped.
#[derive(Default)]
pub struct ScriptedInput {
    lines: Mutex<VecDeque<String>>,
    stopped: Mutex<bool>,
    wake: Condvar,
    /// Emit a blank and a first-word partial before each utterance.
    partials: bool,
    sink: Mutex<Option<TranscriptSink>>,
    /// Captures that fail before the script starts.
    failures: Mutex<usize>,
}

impl ScriptedInput {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: Mutex::new(lines.iter().map(|s| (*s).to_owned()).collect()),
            ..Self::default()
        }
    }

    pub fn with_partials(lines: &[&str]) -> Self {
        Self {
            partials: true,
            ..Self::new(lines)
        }
    }

    pub fn failing_first(failures: usize, lines: &[&str]) -> Self {
        Self {
            failures: Mutex::new(failures),
            ..Self::new(lines)
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap()
    }
}

impl SpeechInput for ScriptedInput {
    fn capture_utterance(&self) -> Result<String> {
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AssistantError::Speech("microphone unavailable".to_owned()));
            }
        }
        let next = self.lines.lock().unwrap().pop_front();
        if let Some(line) = next {
            if self.partials
                && let Some(sink) = self.sink.lock().unwrap().as_ref()
            {
                sink(" ");
                sink(line.split_whitespace().next().unwrap_or_default());
            }
            return Ok(line);
        }
        let mut stopped = self.stopped.lock().unwrap();
        while !*stopped {
            stopped = self.wake.wait(stopped).unwrap();
        }
        Err(AssistantError::Speech("input stopped".to_owned()))
    }

    fn request_stop(&self) {
        *self.stopped.lock().unwrap() = true;
        self.wake.notify_all();
    }

    fn set_partial_transcript_sink(&self, sink: TranscriptSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }
}

/// Records what was spoken; playback finishes instantly unless it is the
/// `hang_on` text, which plays until stopped.
#[derive(Default)]
pub struct RecordingOutput {
    pub spoken: Mutex<Vec<String>>,
    pub stopped: AtomicBool,
    pub hang_on: Option<String>,
}

impl RecordingOutput {
    pub fn hanging_on(text: &str) -> Self {
        Self {
            hang_on: Some(text.to_owned()),
            ..Self::default()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechOutput for RecordingOutput {
    fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_owned());
        Ok(())
    }

    fn is_playing(&self) -> bool {
        let Some(hang_on) = &self.hang_on else {
            return false;
        };
        !self.stopped.load(Ordering::SeqCst)
            && self.spoken.lock().unwrap().last() == Some(hang_on)
    }

    fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

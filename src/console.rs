//! Terminal speech collaborators.
//!
//! [`ConsoleInput`] reads one utterance per stdin line and [`CommandSpeaker`]
//! speaks through a system TTS command (`say` on macOS, `espeak` elsewhere).
//! They stand in for real STT/TTS engines, which live outside this crate.

use crate::error::{AssistantError, Result};
use crate::speech::{SpeechInput, SpeechOutput};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reads utterances from standard input, one per line.
pub struct ConsoleInput {
    stopped: AtomicBool,
    closed: CancellationToken,
}

impl ConsoleInput {
    pub fn new() -> Self {
        Self {
            stopped: AtomicBool::new(false),
            closed: CancellationToken::new(),
        }
    }

    /// Token cancelled once stdin reaches end-of-file.
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    fn read_line(&self, reader: &mut impl BufRead) -> Result<String> {
        if self.stopped.load(Ordering::Acquire) {
            return Ok(String::new());
        }
        if self.closed.is_cancelled() {
            return Err(AssistantError::Speech("console input closed".to_owned()));
        }
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .map_err(|e| AssistantError::Speech(format!("failed to read stdin: {e}")))?;
        if read == 0 {
            debug!("stdin closed");
            self.closed.cancel();
            return Err(AssistantError::Speech("console input closed".to_owned()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechInput for ConsoleInput {
    fn capture_utterance(&self) -> Result<String> {
        self.read_line(&mut std::io::stdin().lock())
    }

    fn request_stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// Speaks through an external TTS command.
///
/// When no command is available the speaker is silent and the caller relies
/// on printed responses.
pub struct CommandSpeaker {
    program: Option<PathBuf>,
    current: Mutex<Option<Child>>,
}

impl CommandSpeaker {
    /// Resolve `command` (or the platform default) on `PATH`.
    pub fn new(command: Option<&str>) -> Self {
        let wanted = command.unwrap_or(default_voice_command());
        let program = match which::which(wanted) {
            Ok(path) => {
                info!("speaking with {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("voice command {wanted:?} unavailable ({e}); responses are text only");
                None
            }
        };
        Self {
            program,
            current: Mutex::new(None),
        }
    }

    /// A speaker that never produces audio.
    pub fn silent() -> Self {
        Self {
            program: None,
            current: Mutex::new(None),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.program.is_none()
    }

    fn kill_current(current: &mut Option<Child>) {
        if let Some(mut child) = current.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl SpeechOutput for CommandSpeaker {
    fn speak(&self, text: &str) -> Result<()> {
        let Some(program) = &self.program else {
            return Ok(());
        };
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        Self::kill_current(&mut current);

        let child = Command::new(program)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                AssistantError::Speech(format!("failed to run {}: {e}", program.display()))
            })?;
        *current = Some(child);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let Some(child) = current.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) | Err(_) => {
                *current = None;
                false
            }
        }
    }

    fn request_stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        Self::kill_current(&mut current);
    }
}

/// `say` on macOS, `espeak` elsewhere.
pub fn default_voice_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak"
    }
}

//! Session lifecycle: greet, then listen → process → speak until stopped.
//!
//! ```text
//!          start()                     capture
//!   Idle ─────────► Speaking ──► Listening ──────► Processing
//!    ▲               (greeting)     ▲  ▲               │
//!    │                              │  └── silent ─────┤
//!    │ loop exit                    │                  ▼
//!    └──────────────────────────────┴─────────────── Speaking
//! ```
//!
//! One background task drives the loop and utterances are handled strictly
//! one at a time. Capture blocks, so it runs on a dedicated OS thread; the
//! loop races it against the session's cancellation token so [`Session::stop`]
//! never waits on the collaborator.

use crate::actions::SystemHost;
use crate::allowlist::AllowlistStore;
use crate::config::AssistantConfig;
use crate::dispatch::Dispatcher;
use crate::error::{AssistantError, Result};
use crate::persona;
use crate::speech::{PollingCompletion, SpeechCompletion, SpeechInput, SpeechOutput};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause after a failed capture before listening again.
const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Where the session is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Listening,
    Processing,
    Speaking,
}

impl SessionState {
    /// Whether moving from `self` to `next` is part of the cycle.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Speaking)
                | (Idle, Listening)
                | (Speaking, Listening)
                | (Listening, Processing)
                | (Processing, Speaking)
                | (Processing, Listening)
                | (_, Idle)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Listening => "listening",
            SessionState::Processing => "processing",
            SessionState::Speaking => "speaking",
        };
        f.write_str(s)
    }
}

/// Called on every state change.
pub type StatusObserver = Arc<dyn Fn(SessionState) + Send + Sync>;
/// Called with a transcription or a response.
pub type TextObserver = Arc<dyn Fn(&str) + Send + Sync>;

/// Current state plus the observer notified when it changes.
struct StateCell {
    state: Mutex<SessionState>,
    observer: Option<StatusObserver>,
}

impl StateCell {
    fn new(observer: Option<StatusObserver>) -> Self {
        Self {
            state: Mutex::new(SessionState::Idle),
            observer,
        }
    }

    fn get(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to `next`. Same-state moves are no-ops; illegal ones are ignored.
    fn set(&self, next: SessionState) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let current = *state;
            if current == next {
                return;
            }
            if !current.can_transition_to(next) {
                warn!("ignoring illegal session transition {current} -> {next}");
                return;
            }
            debug!("session {current} -> {next}");
            *state = next;
        }
        // Notify outside the lock so observers may query the state.
        if let Some(observer) = &self.observer {
            observer(next);
        }
    }
}

/// Everything the background loop needs.
#[derive(Clone)]
struct LoopContext {
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    state: Arc<StateCell>,
    input: Arc<dyn SpeechInput>,
    output: Arc<dyn SpeechOutput>,
    completion: Arc<dyn SpeechCompletion>,
    dispatcher: Arc<tokio::sync::Mutex<Dispatcher>>,
    on_transcription: Option<TextObserver>,
    on_response: Option<TextObserver>,
}

impl LoopContext {
    fn emit_response(&self, text: &str) {
        if let Some(observer) = &self.on_response {
            observer(text);
        }
    }

    fn emit_transcription(&self, text: &str) {
        if let Some(observer) = &self.on_transcription {
            observer(text);
        }
    }

    /// Speak `text` and wait for playback to end.
    ///
    /// Returns `false` if the session was cancelled while waiting.
    async fn say(&self, text: &str) -> bool {
        self.state.set(SessionState::Speaking);
        if let Err(e) = self.output.speak(text) {
            warn!("speech output failed: {e}");
        }
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = self.completion.await_speech_done(self.output.as_ref()) => true,
        }
    }

    fn halt_collaborators(&self) {
        self.input.request_stop();
        self.output.request_stop();
    }
}

/// A running (or startable) voice assistant session.
pub struct Session {
    ctx: LoopContext,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(
        dispatcher: Dispatcher,
        input: Arc<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
    ) -> Self {
        Self {
            ctx: LoopContext {
                running: Arc::new(AtomicBool::new(false)),
                cancel: CancellationToken::new(),
                state: Arc::new(StateCell::new(None)),
                input,
                output,
                completion: Arc::new(PollingCompletion::default()),
                dispatcher: Arc::new(tokio::sync::Mutex::new(dispatcher)),
                on_transcription: None,
                on_response: None,
            },
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Build a session from configuration with the system host.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] if the backend cannot be configured;
    /// nothing is started in that case.
    pub fn from_config(
        config: &AssistantConfig,
        input: Arc<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
    ) -> Result<Self> {
        let backend = crate::backend::from_config(&config.backend)?;
        let allowlist = AllowlistStore::load(&config.allowlist.path);
        let dispatcher = Dispatcher::new(allowlist, Arc::new(SystemHost), backend);
        Ok(Self::new(dispatcher, input, output)
            .with_completion(Arc::new(PollingCompletion::from_config(&config.session))))
    }

    /// Replace the speech-completion strategy.
    pub fn with_completion(mut self, completion: Arc<dyn SpeechCompletion>) -> Self {
        self.ctx.completion = completion;
        self
    }

    pub fn with_status_observer(mut self, observer: StatusObserver) -> Self {
        self.ctx.state = Arc::new(StateCell::new(Some(observer)));
        self
    }

    pub fn with_transcription_observer(mut self, observer: TextObserver) -> Self {
        self.ctx.on_transcription = Some(observer);
        self
    }

    pub fn with_response_observer(mut self, observer: TextObserver) -> Self {
        self.ctx.on_response = Some(observer);
        self
    }

    /// Greet the user, then run the listen loop on a background task.
    ///
    /// Returns once the greeting has been spoken.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Session`] if the session was already started.
    /// A stopped session cannot be restarted.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(AssistantError::Session(
                "session already started".to_owned(),
            ));
        }
        self.ctx.running.store(true, Ordering::Release);
        info!("session starting");

        if let Some(observer) = &self.ctx.on_transcription {
            let observer = Arc::clone(observer);
            self.ctx
                .input
                .set_partial_transcript_sink(Arc::new(move |partial: &str| {
                    if !partial.trim().is_empty() {
                        observer(partial);
                    }
                }));
        }

        let greeting = persona::greeting();
        self.ctx.emit_response(greeting);
        if !self.ctx.say(greeting).await || !self.is_running() {
            self.ctx.halt_collaborators();
            self.ctx.state.set(SessionState::Idle);
            return Ok(());
        }

        let ctx = self.ctx.clone();
        let handle = tokio::spawn(run_loop(ctx));
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    /// Ask the loop to end. Does not wait; safe to call repeatedly.
    pub fn stop(&self) {
        if self.ctx.running.swap(false, Ordering::AcqRel) {
            info!("session stop requested");
        }
        self.ctx.cancel.cancel();
        self.ctx.halt_collaborators();
    }

    /// Wait for the background loop to finish.
    pub async fn wait(&self) {
        let handle = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!("session loop ended abnormally: {e}");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ctx.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state.get()
    }

    /// Token cancelled by [`Session::stop`].
    pub fn cancel_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.ctx.cancel.cancel();
    }
}

async fn run_loop(ctx: LoopContext) {
    info!("listen loop started");

    while ctx.running.load(Ordering::Acquire) {
        ctx.state.set(SessionState::Listening);

        let captured = tokio::select! {
            () = ctx.cancel.cancelled() => break,
            captured = capture_off_executor(Arc::clone(&ctx.input)) => captured,
        };

        let text = match captured {
            Ok(text) => text,
            Err(e) => {
                if !ctx.running.load(Ordering::Acquire) {
                    break;
                }
                warn!("capture failed: {e}");
                tokio::select! {
                    () = ctx.cancel.cancelled() => break,
                    () = tokio::time::sleep(CAPTURE_RETRY_DELAY) => continue,
                }
            }
        };

        if text.trim().is_empty() {
            continue;
        }

        debug!("heard: {text}");
        ctx.emit_transcription(&text);
        ctx.state.set(SessionState::Processing);

        let outcome = tokio::select! {
            () = ctx.cancel.cancelled() => break,
            outcome = async { ctx.dispatcher.lock().await.dispatch(&text).await } => outcome,
        };

        if outcome.is_terminate() {
            info!("terminate intent received");
            ctx.running.store(false, Ordering::Release);
        }

        let Some(response) = outcome.response() else {
            continue;
        };
        ctx.emit_response(response);
        if !ctx.say(response).await {
            break;
        }
    }

    ctx.halt_collaborators();
    ctx.state.set(SessionState::Idle);
    info!("listen loop stopped");
}

/// Run the blocking capture on its own thread.
///
/// A dedicated thread rather than `spawn_blocking` keeps runtime shutdown from
/// waiting on a capture that never returns.
async fn capture_off_executor(input: Arc<dyn SpeechInput>) -> Result<String> {
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("speech-capture".to_owned())
        .spawn(move || {
            let _ = tx.send(input.capture_utterance());
        })
        .map_err(|e| AssistantError::Speech(format!("failed to spawn capture thread: {e}")))?;
    rx.await
        .map_err(|_| AssistantError::Speech("capture thread exited without a result".to_owned()))?
}

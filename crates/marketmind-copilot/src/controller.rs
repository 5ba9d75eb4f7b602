//! Interaction controller: the assistant panel's state machine.
//!
//! Owns the transcript, the draft input and the single current [`Mode`], and
//! drives the capture, playback and transport collaborators. User intents come
//! in as `&mut self` calls; collaborator results come back as tagged
//! [`Completion`]s on the controller's own channel and are applied one at a
//! time with [`Controller::apply`].
//!
//! ```text
//!            submit                      answer (voice on)
//!   Idle ─────────────▶ AwaitingResponse ─────────────────▶ Speaking
//!    ▲ ▲                   │  answer / failure                 │
//!    │ └───────────────────┘                                   │
//!    │        result / error / end / stop      end / error / stop
//!    ├──────────────────────── Listening ◀─── start_capture    │
//!    └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the operation whose tag matches the current phase may move the state;
//! anything else is a stale completion and is dropped.

use crate::capture::{capture_from_config, SpeechCapture};
use crate::config::CopilotConfig;
use crate::error::{CopilotResult, Rejected, TransportError};
use crate::event::{
    CaptureEvent, CaptureSink, Completion, CompletionKind, CompletionSender, PlaybackEvent,
    PlaybackSink, Seq,
};
use crate::playback::{playback_from_config, SpeechPlayback};
use crate::transcript::{Message, Transcript, DEFAULT_SUGGESTIONS, FALLBACK_TEXT};
use crate::transport::{ChatReply, ChatTransport, HttpChatTransport};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What the assistant panel is doing right now. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Idle,
    Listening,
    AwaitingResponse,
    Speaking,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "idle"),
            Mode::Listening => write!(f, "listening"),
            Mode::AwaitingResponse => write!(f, "awaiting response"),
            Mode::Speaking => write!(f, "speaking"),
        }
    }
}

/// Mode plus the tag of the operation that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Listening(Seq),
    AwaitingResponse(Seq),
    Speaking(Seq),
}

impl Phase {
    fn mode(self) -> Mode {
        match self {
            Phase::Idle => Mode::Idle,
            Phase::Listening(_) => Mode::Listening,
            Phase::AwaitingResponse(_) => Mode::AwaitingResponse,
            Phase::Speaking(_) => Mode::Speaking,
        }
    }
}

/// Everything the presentation surface needs to render the panel.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub transcript: Vec<Message>,
    pub mode: Mode,
    pub draft_input: String,
    pub voice_capable: bool,
    pub playback_capable: bool,
    pub voice_enabled: bool,
    pub suggestions: Vec<String>,
    pub suggestions_visible: bool,
}

pub struct Controller {
    transcript: Transcript,
    phase: Phase,
    draft: String,
    voice_enabled: bool,
    suggestions: Vec<String>,
    suggestions_visible: bool,

    capture: Box<dyn SpeechCapture>,
    playback: Box<dyn SpeechPlayback>,
    transport: Arc<dyn ChatTransport>,

    // Highest tag handed out so far.
    issued: Seq,
    completions_tx: CompletionSender,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Controller {
    /// Create a controller with the greeting already in the transcript.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        capture: Box<dyn SpeechCapture>,
        playback: Box<dyn SpeechPlayback>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            transcript: Transcript::with_greeting(),
            phase: Phase::Idle,
            draft: String::new(),
            voice_enabled: false,
            suggestions: DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            suggestions_visible: true,
            capture,
            playback,
            transport,
            issued: 0,
            completions_tx,
            completions_rx,
        }
    }

    /// Wire up the HTTP transport and the configured speech backends.
    pub fn from_config(config: &CopilotConfig) -> CopilotResult<Self> {
        let transport = HttpChatTransport::from_config(config)?;
        info!(endpoint = %transport.endpoint(), "assistant endpoint configured");
        Ok(Self::new(
            Arc::new(transport),
            capture_from_config(config),
            playback_from_config(config),
        )
        .with_voice_enabled(config.voice_enabled)
        .with_suggestions(config.suggestions.clone()))
    }

    pub fn with_voice_enabled(mut self, enabled: bool) -> Self {
        self.voice_enabled = enabled;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    // ── State for the presentation surface ──────────────────────────────

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn mode(&self) -> Mode {
        self.phase.mode()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Whether voice input can be offered.
    pub fn voice_capable(&self) -> bool {
        self.capture.available()
    }

    pub fn playback_capable(&self) -> bool {
        self.playback.available()
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn suggestions_visible(&self) -> bool {
        self.suggestions_visible
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            transcript: self.transcript.messages().to_vec(),
            mode: self.mode(),
            draft_input: self.draft.clone(),
            voice_capable: self.voice_capable(),
            playback_capable: self.playback_capable(),
            voice_enabled: self.voice_enabled,
            suggestions: self.suggestions.clone(),
            suggestions_visible: self.suggestions_visible,
        }
    }

    // ── Intents ─────────────────────────────────────────────────────────

    /// Replace the draft input (typing).
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn set_voice_enabled(&mut self, enabled: bool) {
        self.voice_enabled = enabled;
    }

    /// Append `text` as a user message and ask the assistant.
    ///
    /// Blank text is ignored. Rejected while listening or while a request is
    /// pending; speaking is interrupted. Must be called inside a tokio runtime.
    pub fn submit(&mut self, text: &str) -> Result<(), Rejected> {
        let message = Message::user(text).ok_or(Rejected::EmptyInput)?;

        match self.phase {
            Phase::Listening(_) | Phase::AwaitingResponse(_) => {
                debug!(mode = %self.mode(), "submit rejected");
                return Err(Rejected::Busy(self.mode()));
            }
            Phase::Speaking(seq) => {
                debug!(seq, "submit interrupts playback");
                self.playback.stop();
            }
            Phase::Idle => {}
        }

        let question = message.text.clone();
        self.transcript.append(message);
        self.draft.clear();
        self.suggestions_visible = false;

        let seq = self.issue();
        self.set_phase(Phase::AwaitingResponse(seq));
        info!(seq, "question submitted");

        let transport = Arc::clone(&self.transport);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = transport.ask(&question).await;
            if tx
                .send(Completion {
                    seq,
                    kind: CompletionKind::Transport(outcome),
                })
                .is_err()
            {
                debug!(seq, "controller dropped before chat response");
            }
        });

        Ok(())
    }

    /// Submit whatever is in the draft input.
    pub fn submit_draft(&mut self) -> Result<(), Rejected> {
        let draft = self.draft.clone();
        self.submit(&draft)
    }

    /// Start one speech capture attempt.
    ///
    /// Playback is stopped first so the microphone does not hear the speaker. A
    /// pending request is abandoned: it runs to completion but its answer is
    /// dropped.
    pub fn start_capture(&mut self) -> Result<(), Rejected> {
        if !self.capture.available() {
            return Err(Rejected::CaptureUnavailable);
        }

        match self.phase {
            Phase::Listening(_) => return Err(Rejected::Busy(Mode::Listening)),
            Phase::Speaking(seq) => {
                debug!(seq, "stopping playback before capture");
                self.playback.stop();
            }
            Phase::AwaitingResponse(seq) => {
                info!(seq, "pending request abandoned for capture");
            }
            Phase::Idle => {}
        }

        let seq = self.issue();
        self.set_phase(Phase::Listening(seq));
        self.capture
            .start(CaptureSink::new(seq, self.completions_tx.clone()));
        Ok(())
    }

    pub fn stop_capture(&mut self) -> Result<(), Rejected> {
        match self.phase {
            Phase::Listening(seq) => {
                debug!(seq, "capture stopped by user");
                self.capture.stop();
                self.set_phase(Phase::Idle);
                Ok(())
            }
            _ => Err(Rejected::NothingToStop),
        }
    }

    pub fn stop_speaking(&mut self) -> Result<(), Rejected> {
        match self.phase {
            Phase::Speaking(seq) => {
                debug!(seq, "playback stopped by user");
                self.playback.stop();
                self.set_phase(Phase::Idle);
                Ok(())
            }
            _ => Err(Rejected::NothingToStop),
        }
    }

    /// Read transcript message `index` aloud, replacing any current utterance.
    pub fn speak_message(&mut self, index: usize) -> Result<(), Rejected> {
        let text = self
            .transcript
            .get(index)
            .map(|m| m.text.clone())
            .ok_or(Rejected::NoSuchMessage(index))?;

        if let Phase::Listening(_) | Phase::AwaitingResponse(_) = self.phase {
            return Err(Rejected::Busy(self.mode()));
        }
        if !self.playback.available() {
            return Err(Rejected::PlaybackUnavailable);
        }

        let next = self.begin_playback(&text);
        self.set_phase(next);
        Ok(())
    }

    /// Leave a pending request behind (e.g. the panel was closed). Its answer
    /// will be discarded when it arrives.
    pub fn abandon_request(&mut self) -> Result<(), Rejected> {
        match self.phase {
            Phase::AwaitingResponse(seq) => {
                info!(seq, "pending request abandoned");
                self.set_phase(Phase::Idle);
                Ok(())
            }
            _ => Err(Rejected::NothingToStop),
        }
    }

    /// Copy suggestion `index` into the draft input.
    pub fn use_suggestion(&mut self, index: usize) -> Result<(), Rejected> {
        let text = self
            .suggestions
            .get(index)
            .cloned()
            .ok_or(Rejected::NoSuchSuggestion(index))?;
        self.draft = text;
        self.suggestions_visible = false;
        Ok(())
    }

    /// Submit suggestion `index` directly.
    pub fn ask_suggestion(&mut self, index: usize) -> Result<(), Rejected> {
        let text = self
            .suggestions
            .get(index)
            .cloned()
            .ok_or(Rejected::NoSuchSuggestion(index))?;
        self.submit(&text)
    }

    // ── Completions ─────────────────────────────────────────────────────

    /// Wait for the next collaborator completion. Cancel safe.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions_rx.recv().await
    }

    /// A completion that has already arrived, if any.
    pub fn try_next_completion(&mut self) -> Option<Completion> {
        self.completions_rx.try_recv().ok()
    }

    /// Wait for one completion and apply it. Returns whether it changed anything.
    pub async fn step(&mut self) -> bool {
        match self.next_completion().await {
            Some(completion) => self.apply(completion),
            None => false,
        }
    }

    /// Apply a completion. Stale completions are dropped and `false` is returned.
    pub fn apply(&mut self, completion: Completion) -> bool {
        let Completion { seq, kind } = completion;
        match kind {
            CompletionKind::Transport(outcome) => self.apply_transport(seq, outcome),
            CompletionKind::Capture(event) => self.apply_capture(seq, event),
            CompletionKind::Playback(event) => self.apply_playback(seq, event),
        }
    }

    fn apply_transport(&mut self, seq: Seq, outcome: Result<ChatReply, TransportError>) -> bool {
        if self.phase != Phase::AwaitingResponse(seq) {
            debug!(seq, mode = %self.mode(), "stale chat response discarded");
            return false;
        }

        let message = outcome.and_then(|reply| {
            Message::assistant(&reply.answer, reply.action_items)
                .ok_or_else(|| TransportError::MalformedResponse("empty answer".to_string()))
        });

        match message {
            Ok(message) => {
                info!(seq, action_items = message.action_items.len(), "answer received");
                let answer = message.text.clone();
                self.transcript.append(message);
                let next = if self.voice_enabled && self.playback.available() {
                    self.begin_playback(&answer)
                } else {
                    Phase::Idle
                };
                self.set_phase(next);
            }
            Err(e) => {
                warn!(seq, error = %e, "chat request failed");
                if let Some(fallback) = Message::assistant(FALLBACK_TEXT, Vec::new()) {
                    self.transcript.append(fallback);
                }
                self.set_phase(Phase::Idle);
            }
        }
        true
    }

    fn apply_capture(&mut self, seq: Seq, event: CaptureEvent) -> bool {
        match self.phase {
            Phase::Listening(current) if current == seq => {
                match event {
                    CaptureEvent::Result(text) => {
                        self.take_capture_text(seq, &text);
                    }
                    CaptureEvent::Error(e) => debug!(seq, error = %e, "capture failed"),
                    CaptureEvent::End => debug!(seq, "capture ended without result"),
                }
                self.set_phase(Phase::Idle);
                true
            }
            // A result that raced the user's stop still lands, as long as
            // nothing newer has been issued since.
            Phase::Idle if seq == self.issued => match event {
                CaptureEvent::Result(text) => self.take_capture_text(seq, &text),
                _ => false,
            },
            _ => {
                debug!(seq, mode = %self.mode(), "stale capture event discarded");
                false
            }
        }
    }

    fn take_capture_text(&mut self, seq: Seq, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            debug!(seq, "capture produced blank text");
            return false;
        }
        info!(seq, "capture result placed in draft");
        self.draft = text.to_string();
        true
    }

    fn apply_playback(&mut self, seq: Seq, event: PlaybackEvent) -> bool {
        if self.phase != Phase::Speaking(seq) {
            debug!(seq, mode = %self.mode(), "stale playback event discarded");
            return false;
        }
        match event {
            PlaybackEvent::Started => {
                debug!(seq, "utterance audible");
            }
            PlaybackEvent::Ended => {
                self.set_phase(Phase::Idle);
            }
            PlaybackEvent::Failed(e) => {
                warn!(seq, error = %e, "playback failed");
                self.set_phase(Phase::Idle);
            }
        }
        true
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn issue(&mut self) -> Seq {
        self.issued += 1;
        self.issued
    }

    /// Start speaking `text` and return the phase to enter.
    fn begin_playback(&mut self, text: &str) -> Phase {
        let seq = self.issue();
        match self
            .playback
            .speak(text, PlaybackSink::new(seq, self.completions_tx.clone()))
        {
            Ok(()) => Phase::Speaking(seq),
            Err(e) => {
                warn!(seq, error = %e, "playback could not start");
                self.playback.stop();
                Phase::Idle
            }
        }
    }

    fn set_phase(&mut self, next: Phase) {
        if self.phase.mode() != next.mode() {
            info!(from = %self.phase.mode(), to = %next.mode(), "mode changed");
        }
        self.phase = next;
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.capture.stop();
        self.playback.stop();
    }
}

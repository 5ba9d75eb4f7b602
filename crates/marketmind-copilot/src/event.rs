//! Sequence-tagged completions flowing back into the controller.
//!
//! Every asynchronous operation the controller issues (a chat request, a
//! capture attempt, an utterance) gets a fresh [`Seq`]. Collaborators report
//! back through a sink that stamps that tag on each event, so the controller
//! can tell a current completion from a stale one.

use crate::error::{CaptureError, PlaybackError, TransportError};
use crate::transport::ChatReply;
use tokio::sync::mpsc;
use tracing::trace;

/// Monotonically increasing operation tag, assigned when an operation is issued.
pub type Seq = u64;

/// Events emitted by a speech capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Recognised text.
    Result(String),
    /// The attempt failed.
    Error(CaptureError),
    /// The engine stopped without a result or an error.
    End,
}

/// Events emitted by an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    Ended,
    Failed(PlaybackError),
}

/// What finished.
#[derive(Debug, Clone)]
pub enum CompletionKind {
    Transport(Result<ChatReply, TransportError>),
    Capture(CaptureEvent),
    Playback(PlaybackEvent),
}

/// A tagged completion waiting to be applied by the controller.
#[derive(Debug, Clone)]
pub struct Completion {
    pub seq: Seq,
    pub kind: CompletionKind,
}

pub(crate) type CompletionSender = mpsc::UnboundedSender<Completion>;

fn post(tx: &CompletionSender, seq: Seq, kind: CompletionKind) {
    // The receiver only goes away with the controller; late events have nowhere to land.
    if tx.send(Completion { seq, kind }).is_err() {
        trace!(seq, "controller gone, dropping completion");
    }
}

/// Handed to a capture adapter on `start`. Cheap to clone and `Send`, so it can
/// move into whatever task or thread drives the recognizer.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    seq: Seq,
    tx: CompletionSender,
}

impl CaptureSink {
    pub(crate) fn new(seq: Seq, tx: CompletionSender) -> Self {
        Self { seq, tx }
    }

    pub fn seq(&self) -> Seq {
        self.seq
    }

    pub fn result(&self, text: impl Into<String>) {
        self.emit(CaptureEvent::Result(text.into()));
    }

    pub fn error(&self, error: CaptureError) {
        self.emit(CaptureEvent::Error(error));
    }

    pub fn end(&self) {
        self.emit(CaptureEvent::End);
    }

    pub fn emit(&self, event: CaptureEvent) {
        post(&self.tx, self.seq, CompletionKind::Capture(event));
    }
}

/// Handed to a playback adapter on `speak`.
#[derive(Debug, Clone)]
pub struct PlaybackSink {
    seq: Seq,
    tx: CompletionSender,
}

impl PlaybackSink {
    pub(crate) fn new(seq: Seq, tx: CompletionSender) -> Self {
        Self { seq, tx }
    }

    pub fn seq(&self) -> Seq {
        self.seq
    }

    pub fn started(&self) {
        self.emit(PlaybackEvent::Started);
    }

    pub fn ended(&self) {
        self.emit(PlaybackEvent::Ended);
    }

    pub fn failed(&self, error: PlaybackError) {
        self.emit(PlaybackEvent::Failed(error));
    }

    pub fn emit(&self, event: PlaybackEvent) {
        post(&self.tx, self.seq, CompletionKind::Playback(event));
    }
}

/// Standalone sink pair for driving an adapter outside a controller.
///
/// Returns the receiving end so the caller can observe what the adapter emits.
pub fn capture_channel(seq: Seq) -> (CaptureSink, mpsc::UnboundedReceiver<Completion>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CaptureSink::new(seq, tx), rx)
}

/// See [`capture_channel`].
pub fn playback_channel(seq: Seq) -> (PlaybackSink, mpsc::UnboundedReceiver<Completion>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PlaybackSink::new(seq, tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_stamps_its_seq() {
        let (sink, mut rx) = capture_channel(7);
        sink.result("hello");
        let c = rx.try_recv().unwrap();
        assert_eq!(c.seq, 7);
        assert!(matches!(
            c.kind,
            CompletionKind::Capture(CaptureEvent::Result(ref t)) if t == "hello"
        ));
    }

    #[test]
    fn emitting_after_receiver_dropped_is_silent() {
        let (sink, rx) = playback_channel(3);
        drop(rx);
        sink.ended();
    }
}

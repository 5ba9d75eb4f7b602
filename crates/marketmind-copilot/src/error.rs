//! Error types for the MarketMind copilot
//!
//! Nothing in the interaction loop is fatal: capture, playback and transport
//! failures all degrade the controller back to `Idle`. These enums exist so the
//! degradation is typed and loggable. `CopilotError` covers construction and
//! configuration, the only places a caller has to handle a hard failure.

use crate::controller::Mode;
use thiserror::Error;

/// Result type alias for construction and configuration.
pub type CopilotResult<T> = Result<T, CopilotError>;

/// Errors that can stop the copilot from being built.
#[derive(Error, Debug)]
pub enum CopilotError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport setup failed: {0}")]
    TransportSetup(String),
}

/// Why a speech capture attempt produced no text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("speech capture is not available")]
    Unavailable,

    #[error("speech capture already started")]
    AlreadyStarted,

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no speech was recognised")]
    NoMatch,

    #[error("recognizer failed: {0}")]
    Engine(String),
}

/// Why an utterance could not be played.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("speech playback is not available")]
    Unavailable,

    #[error("nothing to say")]
    EmptyUtterance,

    #[error("speech engine failed: {0}")]
    Engine(String),
}

/// Why a chat request failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("assistant endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::MalformedResponse(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// An intent that was ignored. Rejections are no-ops, not failures: the
/// controller state is exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    #[error("input is empty")]
    EmptyInput,

    #[error("not allowed while {0}")]
    Busy(Mode),

    #[error("speech capture is not available")]
    CaptureUnavailable,

    #[error("speech playback is not available")]
    PlaybackUnavailable,

    #[error("nothing to stop")]
    NothingToStop,

    #[error("no message at index {0}")]
    NoSuchMessage(usize),

    #[error("no suggestion at index {0}")]
    NoSuchSuggestion(usize),
}

//! MarketMind Copilot: Conversational Assistant Controller
//!
//! The state machine behind the MarketMind assistant panel. A user asks a
//! question by typing or by voice, the question goes to the analytics backend's
//! chat endpoint, and the answer (with its action items) lands in the
//! transcript and is optionally read aloud.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────┐  intents   ┌─────────────────────────────┐
//!   │ presentation │──────────▶│ Controller                  │
//!   │  (console)   │◀──────────│  mode · transcript · draft  │
//!   └──────────────┘  snapshot  └──────┬──────────┬─────────┬─┘
//!                                      │          │         │
//!                           ┌──────────▼─┐ ┌──────▼────┐ ┌──▼──────────┐
//!                           │SpeechCapture│ │ChatTransport│ │SpeechPlayback│
//!                           └──────────┬─┘ └──────┬────┘ └──┬──────────┘
//!                                      │  tagged Completions │
//!                                      └──────────┴─────────┘
//!                                             (mpsc)
//! ```
//!
//! Every asynchronous operation carries a sequence tag. The controller applies a
//! completion only while its tag still owns the current mode, so a late answer
//! or a stopped recognizer can never overwrite a newer interaction.
//!
//! ## Modules
//!
//! - `controller`: modes, intents and completion handling
//! - `transcript`: append-only message history
//! - `capture` / `playback`: speech adapters (external commands or unavailable)
//! - `transport`: `POST /chat` client
//! - `event`: sequence-tagged completions and adapter sinks
//! - `config`: file + environment configuration

pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod playback;
pub mod transcript;
pub mod transport;

pub use capture::{capture_from_config, CommandCapture, SpeechCapture, UnavailableCapture};
pub use config::{CommandSpec, CopilotConfig};
pub use controller::{Controller, Mode, Snapshot};
pub use error::{
    CaptureError, CopilotError, CopilotResult, PlaybackError, Rejected, TransportError,
};
pub use event::{
    capture_channel, playback_channel, CaptureEvent, CaptureSink, Completion, CompletionKind,
    PlaybackEvent, PlaybackSink, Seq,
};
pub use playback::{playback_from_config, CommandPlayback, SpeechPlayback, UnavailablePlayback};
pub use transcript::{Message, Role, Transcript, DEFAULT_SUGGESTIONS, FALLBACK_TEXT, GREETING};
pub use transport::{ChatReply, ChatTransport, HttpChatTransport};

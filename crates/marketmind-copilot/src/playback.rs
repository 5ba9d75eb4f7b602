//! **Speech playback**: text-to-speech with a queue of depth one.
//!
//! `speak` always cancels whatever is playing before starting the new
//! utterance; two overlapping utterances are unintelligible. A cancelled
//! utterance emits nothing, so every lifecycle ends with at most one `Ended`.

use crate::config::{CommandSpec, CopilotConfig};
use crate::error::PlaybackError;
use crate::event::PlaybackSink;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Backend that speaks text aloud.
pub trait SpeechPlayback: Send {
    /// Whether this platform can speak at all.
    fn available(&self) -> bool;

    /// Cancel any current utterance, then start speaking `text`.
    ///
    /// `Ok` means the utterance started; `Started`, then `Ended` or `Failed`,
    /// follow through `sink`.
    fn speak(&mut self, text: &str, sink: PlaybackSink) -> Result<(), PlaybackError>;

    /// Cancel immediately. No-op when nothing is playing.
    fn stop(&mut self);
}

/// Playback for platforms without a speech engine.
#[derive(Debug, Default)]
pub struct UnavailablePlayback;

impl SpeechPlayback for UnavailablePlayback {
    fn available(&self) -> bool {
        false
    }

    fn speak(&mut self, _text: &str, _sink: PlaybackSink) -> Result<(), PlaybackError> {
        Err(PlaybackError::Unavailable)
    }

    fn stop(&mut self) {}
}

/// Speaks by running a TTS program once per utterance, with the text as its
/// last argument (e.g. `espeak-ng -v en-us`, `say -v Samantha`).
///
/// Must be used from within a tokio runtime.
pub struct CommandPlayback {
    command: CommandSpec,
    installed: bool,
    current: Option<oneshot::Sender<()>>,
}

impl CommandPlayback {
    pub fn new(command: CommandSpec) -> Self {
        let installed = command.is_installed();
        if !installed {
            warn!(program = %command.program, "playback program not found; voice output disabled");
        }
        Self {
            command,
            installed,
            current: None,
        }
    }
}

impl SpeechPlayback for CommandPlayback {
    fn available(&self) -> bool {
        self.installed
    }

    fn speak(&mut self, text: &str, sink: PlaybackSink) -> Result<(), PlaybackError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlaybackError::EmptyUtterance);
        }

        self.stop();

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PlaybackError::Unavailable,
                _ => PlaybackError::Engine(e.to_string()),
            })?;

        info!(seq = sink.seq(), chars = text.len(), "utterance started");
        sink.started();

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            // Cancellation wins over an exit that has not been reported yet.
            tokio::select! {
                biased;
                // The child is killed when it drops at the end of this task.
                _ = cancel_rx => debug!(seq = sink.seq(), "utterance cancelled"),
                status = child.wait() => match status {
                    Ok(status) if status.success() => sink.ended(),
                    Ok(status) => sink.failed(PlaybackError::Engine(format!("exited with {}", status))),
                    Err(e) => sink.failed(PlaybackError::Engine(e.to_string())),
                },
            }
        });

        self.current = Some(cancel_tx);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.current.take() {
            let _ = cancel.send(());
        }
    }
}

/// Pick the playback backend described by `config`.
/// `playback_command` set → [`CommandPlayback`]; otherwise [`UnavailablePlayback`].
pub fn playback_from_config(config: &CopilotConfig) -> Box<dyn SpeechPlayback> {
    match config.playback_command() {
        Some(command) => Box::new(CommandPlayback::new(command)),
        None => Box::new(UnavailablePlayback),
    }
}

//! **Speech capture**: one-shot speech-to-text behind a uniform interface.
//!
//! Implement [`SpeechCapture`] for whatever recognizer the platform offers. The
//! controller owns one adapter instance and only ever runs one attempt at a
//! time; each attempt reports through the [`CaptureSink`] it was started with.
//! Use [`capture_from_config`] to get the best available backend.

use crate::config::{CommandSpec, CopilotConfig};
use crate::error::CaptureError;
use crate::event::CaptureSink;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A one-shot speech recognizer.
///
/// Each `start` begins one best-effort attempt, which reports exactly one of
/// `result`, `error` or `end` through its sink. Calling `start` while an attempt
/// is running reports [`CaptureError::AlreadyStarted`] instead of failing.
pub trait SpeechCapture: Send {
    /// Whether this platform can capture speech at all.
    fn available(&self) -> bool;

    /// Begin one recognition attempt.
    fn start(&mut self, sink: CaptureSink);

    /// Ask the running attempt to stop early. A result that is already on its
    /// way may still arrive.
    fn stop(&mut self);
}

/// Capture for platforms without a recognizer.
#[derive(Debug, Default)]
pub struct UnavailableCapture;

impl SpeechCapture for UnavailableCapture {
    fn available(&self) -> bool {
        false
    }

    fn start(&mut self, sink: CaptureSink) {
        sink.error(CaptureError::Unavailable);
    }

    fn stop(&mut self) {}
}

struct RunningCapture {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Runs an external recognizer once per attempt and reads the transcript from
/// its stdout.
///
/// `{locale}` in the arguments is replaced with the configured locale, e.g.
/// `listen-once --lang {locale}`. Must be started from within a tokio runtime.
pub struct CommandCapture {
    command: CommandSpec,
    locale: String,
    installed: bool,
    running: Option<RunningCapture>,
}

impl CommandCapture {
    pub fn new(command: CommandSpec, locale: impl Into<String>) -> Self {
        let installed = command.is_installed();
        if !installed {
            warn!(program = %command.program, "capture program not found; voice input disabled");
        }
        Self {
            command,
            locale: locale.into(),
            installed,
            running: None,
        }
    }

    fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|r| !r.task.is_finished())
            .unwrap_or(false)
    }
}

impl SpeechCapture for CommandCapture {
    fn available(&self) -> bool {
        self.installed
    }

    fn start(&mut self, sink: CaptureSink) {
        if self.is_running() {
            warn!(seq = sink.seq(), "capture start ignored: attempt already running");
            sink.error(CaptureError::AlreadyStarted);
            return;
        }

        let args = self
            .command
            .args
            .iter()
            .map(|a| a.replace("{locale}", &self.locale));
        let mut cmd = Command::new(&self.command.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.command.program, error = %e, "capture spawn failed");
                sink.error(spawn_error(&e));
                return;
            }
        };

        info!(seq = sink.seq(), locale = %self.locale, "capture started");
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                output = child.wait_with_output() => match output {
                    Ok(output) => report_output(&sink, output),
                    Err(e) => sink.error(CaptureError::Engine(e.to_string())),
                },
                // Dropping the child future kills the recognizer.
                _ = stop_rx => debug!(seq = sink.seq(), "capture stopped by user"),
            }
        });

        self.running = Some(RunningCapture { stop_tx, task });
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.stop_tx.send(());
        }
    }
}

fn spawn_error(err: &std::io::Error) -> CaptureError {
    match err.kind() {
        std::io::ErrorKind::NotFound => CaptureError::Unavailable,
        std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
        _ => CaptureError::Engine(err.to_string()),
    }
}

fn report_output(sink: &CaptureSink, output: Output) {
    if output.status.success() {
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            sink.error(CaptureError::NoMatch);
        } else {
            debug!(seq = sink.seq(), "capture result: {}", text);
            sink.result(text);
        }
        return;
    }

    match output.status.code() {
        // Killed by a signal: the engine just stopped.
        None => sink.end(),
        Some(126) => sink.error(CaptureError::PermissionDenied),
        Some(127) => sink.error(CaptureError::Unavailable),
        Some(code) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            sink.error(CaptureError::Engine(format!("exit {}: {}", code, stderr)));
        }
    }
}

/// Pick the capture backend described by `config`.
/// `capture_command` set → [`CommandCapture`]; otherwise [`UnavailableCapture`].
pub fn capture_from_config(config: &CopilotConfig) -> Box<dyn SpeechCapture> {
    match config.capture_command() {
        Some(command) => Box::new(CommandCapture::new(command, config.locale.clone())),
        None => Box::new(UnavailableCapture),
    }
}

//! Command-backed speech adapters driven with ordinary POSIX utilities.
#![cfg(unix)]

use marketmind_copilot::{
    capture_channel, playback_channel, CaptureError, CaptureEvent, CommandCapture,
    CommandPlayback, CommandSpec, Completion, CompletionKind, PlaybackError, PlaybackEvent,
    SpeechCapture, SpeechPlayback,
};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

fn spec(line: &str) -> CommandSpec {
    CommandSpec::parse(line).unwrap()
}

async fn next(rx: &mut UnboundedReceiver<Completion>) -> Completion {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("adapter went quiet")
        .expect("channel closed")
}

/// No event arrives. A closed channel counts as quiet.
async fn assert_quiet(rx: &mut UnboundedReceiver<Completion>) {
    if let Ok(Some(completion)) = timeout(Duration::from_millis(300), rx.recv()).await {
        panic!("unexpected event {:?}", completion);
    }
}

async fn capture_event(rx: &mut UnboundedReceiver<Completion>) -> CaptureEvent {
    match next(rx).await.kind {
        CompletionKind::Capture(event) => event,
        other => panic!("expected capture event, got {:?}", other),
    }
}

async fn playback_event(rx: &mut UnboundedReceiver<Completion>) -> PlaybackEvent {
    match next(rx).await.kind {
        CompletionKind::Playback(event) => event,
        other => panic!("expected playback event, got {:?}", other),
    }
}

#[tokio::test]
async fn capture_reads_stdout_with_locale() {
    let mut capture = CommandCapture::new(spec("echo heard {locale}"), "en-US");
    assert!(capture.available());

    let (sink, mut rx) = capture_channel(4);
    capture.start(sink);

    let completion = next(&mut rx).await;
    assert_eq!(completion.seq, 4);
    assert!(matches!(
        completion.kind,
        CompletionKind::Capture(CaptureEvent::Result(ref text)) if text == "heard en-US"
    ));
}

#[tokio::test]
async fn silent_recognizer_is_no_match() {
    let mut capture = CommandCapture::new(spec("true"), "en-US");
    let (sink, mut rx) = capture_channel(1);
    capture.start(sink);
    assert_eq!(
        capture_event(&mut rx).await,
        CaptureEvent::Error(CaptureError::NoMatch)
    );
}

#[tokio::test]
async fn failing_recognizer_is_engine_error() {
    let mut capture = CommandCapture::new(spec("false"), "en-US");
    let (sink, mut rx) = capture_channel(1);
    capture.start(sink);
    assert!(matches!(
        capture_event(&mut rx).await,
        CaptureEvent::Error(CaptureError::Engine(ref msg)) if msg.starts_with("exit 1")
    ));
}

#[tokio::test]
async fn missing_recognizer_is_unavailable() {
    let mut capture = CommandCapture::new(spec("no-such-recognizer-9c2e"), "en-US");
    assert!(!capture.available());
    let (sink, mut rx) = capture_channel(1);
    capture.start(sink);
    assert_eq!(
        capture_event(&mut rx).await,
        CaptureEvent::Error(CaptureError::Unavailable)
    );
}

#[tokio::test]
async fn second_start_reports_already_started() {
    let mut capture = CommandCapture::new(spec("sleep 5"), "en-US");
    let (first, mut first_rx) = capture_channel(1);
    capture.start(first);

    let (second, mut second_rx) = capture_channel(2);
    capture.start(second);
    assert_eq!(
        capture_event(&mut second_rx).await,
        CaptureEvent::Error(CaptureError::AlreadyStarted)
    );

    capture.stop();
    assert_quiet(&mut first_rx).await;
}

#[tokio::test]
async fn stopped_capture_stays_silent() {
    let mut capture = CommandCapture::new(spec("sleep 5"), "en-US");
    let (sink, mut rx) = capture_channel(1);
    capture.start(sink);
    capture.stop();
    capture.stop();
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn playback_runs_to_completion() {
    let mut playback = CommandPlayback::new(spec("echo"));
    assert!(playback.available());

    let (sink, mut rx) = playback_channel(3);
    playback.speak("Restock SKU-42", sink).unwrap();
    assert_eq!(playback_event(&mut rx).await, PlaybackEvent::Started);
    assert_eq!(playback_event(&mut rx).await, PlaybackEvent::Ended);
}

#[tokio::test]
async fn failing_engine_reports_failure() {
    let mut playback = CommandPlayback::new(spec("false"));
    let (sink, mut rx) = playback_channel(1);
    playback.speak("hello", sink).unwrap();
    assert_eq!(playback_event(&mut rx).await, PlaybackEvent::Started);
    assert!(matches!(
        playback_event(&mut rx).await,
        PlaybackEvent::Failed(PlaybackError::Engine(_))
    ));
}

#[tokio::test]
async fn new_utterance_cancels_old_one() {
    // `sleep` takes the utterance as its duration.
    let mut playback = CommandPlayback::new(spec("sleep"));

    let (long, mut long_rx) = playback_channel(1);
    playback.speak("5", long).unwrap();
    assert_eq!(playback_event(&mut long_rx).await, PlaybackEvent::Started);

    let (short, mut short_rx) = playback_channel(2);
    playback.speak("0", short).unwrap();
    assert_eq!(playback_event(&mut short_rx).await, PlaybackEvent::Started);
    assert_eq!(playback_event(&mut short_rx).await, PlaybackEvent::Ended);

    assert_quiet(&mut long_rx).await;
}

#[tokio::test]
async fn stopped_utterance_emits_no_end() {
    let mut playback = CommandPlayback::new(spec("sleep"));
    let (sink, mut rx) = playback_channel(1);
    playback.speak("5", sink).unwrap();
    assert_eq!(playback_event(&mut rx).await, PlaybackEvent::Started);

    playback.stop();
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn stop_wins_over_an_unreported_exit() {
    // Current-thread runtime: the wait task cannot run until this test yields,
    // so the engine has already exited by the time `stop` is sent.
    let mut playback = CommandPlayback::new(spec("true"));
    let (sink, mut rx) = playback_channel(1);
    playback.speak("done already", sink).unwrap();
    assert!(matches!(
        rx.try_recv().unwrap().kind,
        CompletionKind::Playback(PlaybackEvent::Started)
    ));

    std::thread::sleep(Duration::from_millis(200));
    playback.stop();
    assert_quiet(&mut rx).await;
}

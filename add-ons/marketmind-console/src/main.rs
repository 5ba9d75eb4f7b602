//! MarketMind Console
//!
//! Terminal surface for the assistant panel. Plain lines are submitted as
//! questions; slash commands drive voice input, playback and suggestions. Chat
//! goes to stdout, logs go to stderr (`RUST_LOG`, default `info`).

use marketmind_copilot::{Controller, CopilotConfig, Message, Mode, Rejected, Role};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
Type a question and press enter, or:
  /listen        speak a question (result lands in the draft)
  /stop          stop listening
  /send          submit the draft
  /say N         read message N aloud
  /hush          stop speaking
  /voice on|off  read answers aloud automatically
  /suggest       show suggested questions
  /ask N         ask suggestion N
  /use N         copy suggestion N into the draft
  /abandon       give up on the pending answer
  /history       show the whole conversation
  /status        show the current mode and capabilities
  /help          show this help
  /quit          leave";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[marketmind] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CopilotConfig::load()?;
    let mut controller = Controller::from_config(&config)?;
    tracing::info!(
        api_url = %config.api_url,
        voice_capable = controller.voice_capable(),
        playback_capable = controller.playback_capable(),
        "MarketMind console started"
    );

    let mut view = View::default();
    view.render(&controller);
    print_suggestions(&controller);
    println!("(/help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if handle_line(&mut controller, &line) == Flow::Quit {
                        break;
                    }
                }
                None => break,
            },
            completion = controller.next_completion() => {
                if let Some(completion) = completion {
                    controller.apply(completion);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; leaving");
                break;
            }
        }
        view.render(&controller);
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn handle_line(controller: &mut Controller, line: &str) -> Flow {
    let line = line.trim();
    if line.is_empty() {
        return Flow::Continue;
    }

    let Some(command) = line.strip_prefix('/') else {
        report(controller.submit(line));
        return Flow::Continue;
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match name {
        "quit" | "exit" => return Flow::Quit,
        "listen" => report(controller.start_capture()),
        "stop" => report(controller.stop_capture()),
        "hush" => report(controller.stop_speaking()),
        "send" => report(controller.submit_draft()),
        "abandon" => report(controller.abandon_request()),
        "say" => match position(arg) {
            Some(index) => report(controller.speak_message(index)),
            None => println!("  usage: /say N"),
        },
        "ask" => match position(arg) {
            Some(index) => report(controller.ask_suggestion(index)),
            None => println!("  usage: /ask N"),
        },
        "use" => match position(arg) {
            Some(index) => report(controller.use_suggestion(index)),
            None => println!("  usage: /use N"),
        },
        "voice" => match arg {
            Some("on") => {
                controller.set_voice_enabled(true);
                println!("  answers will be read aloud");
            }
            Some("off") => {
                controller.set_voice_enabled(false);
                println!("  answers will not be read aloud");
            }
            _ => println!("  usage: /voice on|off"),
        },
        "suggest" => print_suggestions(controller),
        "history" => {
            for (index, message) in controller.transcript().iter().enumerate() {
                print_message(index, message);
            }
        }
        "status" => print_status(controller),
        "help" => println!("{}", HELP),
        other => println!("  unknown command /{} (try /help)", other),
    }
    Flow::Continue
}

/// Parse a 1-based position as shown on screen.
fn position(arg: Option<&str>) -> Option<usize> {
    arg?.parse::<usize>().ok()?.checked_sub(1)
}

fn report(outcome: Result<(), Rejected>) {
    match outcome {
        Ok(()) => {}
        Err(Rejected::EmptyInput) => {}
        Err(Rejected::NoSuchMessage(i)) => println!("  no message {}", i + 1),
        Err(Rejected::NoSuchSuggestion(i)) => println!("  no suggestion {}", i + 1),
        Err(other) => println!("  ({})", other),
    }
}

fn print_message(index: usize, message: &Message) {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    println!("[{}] {}> {}", index + 1, who, message.text);
    for item in &message.action_items {
        println!("      • {}", item);
    }
}

fn print_suggestions(controller: &Controller) {
    for (index, suggestion) in controller.suggestions().iter().enumerate() {
        println!("  {}. {}", index + 1, suggestion);
    }
}

fn print_status(controller: &Controller) {
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    println!("  mode:          {}", controller.mode());
    println!("  voice input:   {}", yes_no(controller.voice_capable()));
    println!("  voice output:  {}", yes_no(controller.playback_capable()));
    println!("  read answers:  {}", yes_no(controller.voice_enabled()));
    if !controller.draft().is_empty() {
        println!("  draft:         {}", controller.draft());
    }
}

/// Tracks what has already been printed so each render only shows changes.
struct View {
    shown: usize,
    mode: Mode,
    draft: String,
}

impl Default for View {
    fn default() -> Self {
        Self {
            shown: 0,
            mode: Mode::Idle,
            draft: String::new(),
        }
    }
}

impl View {
    fn render(&mut self, controller: &Controller) {
        let transcript = controller.transcript();
        for index in self.shown..transcript.len() {
            if let Some(message) = transcript.get(index) {
                print_message(index, message);
            }
        }
        self.shown = transcript.len();

        let mode = controller.mode();
        if mode != self.mode {
            match mode {
                Mode::Listening => println!("  … listening (/stop to cancel)"),
                Mode::AwaitingResponse => println!("  … thinking"),
                Mode::Speaking => println!("  … speaking (/hush to stop)"),
                Mode::Idle => {}
            }
            self.mode = mode;
        }

        if controller.draft() != self.draft {
            self.draft = controller.draft().to_string();
            if !self.draft.is_empty() {
                println!("  draft: {}  (/send to ask)", self.draft);
            }
        }
    }
}

//! Copilot configuration loaded from file and environment.
//!
//! Precedence: env `MARKETMIND_CONFIG` path > `config/copilot.toml` > defaults,
//! then `MARKETMIND__*` environment overrides on top (e.g.
//! `MARKETMIND__API_URL=http://analytics:8000`).
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | api_url | http://localhost:8000 | Base URL of the chat endpoint (`/chat` is appended). |
//! | request_timeout_secs | 30 | Client timeout for one question. |
//! | voice_enabled | false | Speak every answer aloud. |
//! | locale | en-US | Locale passed to the recognizer (`{locale}`). |
//! | capture_command | unset | Recognizer command line; unset disables voice input. |
//! | playback_command | unset | TTS command line; unset disables voice output. |
//! | suggestions | built-in list | Suggested questions shown before the first submit. |

use crate::error::{CopilotError, CopilotResult};
use crate::transcript::DEFAULT_SUGGESTIONS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/copilot";
const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOCALE: &str = "en-US";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_suggestions() -> Vec<String> {
    DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub voice_enabled: bool,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub capture_command: Option<String>,
    #[serde(default)]
    pub playback_command: Option<String>,
    #[serde(default = "default_suggestions")]
    pub suggestions: Vec<String>,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_timeout_secs(),
            voice_enabled: false,
            locale: default_locale(),
            capture_command: None,
            playback_command: None,
            suggestions: default_suggestions(),
        }
    }
}

impl CopilotConfig {
    /// Load from the default file location and the environment.
    pub fn load() -> CopilotResult<Self> {
        let path = std::env::var("MARKETMIND_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    /// Load from a specific file (a missing file is fine) and the environment.
    pub fn load_from(path: &Path) -> CopilotResult<Self> {
        let builder = config::Config::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("request_timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
            .set_default("voice_enabled", false)?
            .set_default("locale", DEFAULT_LOCALE)?;

        // `config` resolves extensionless names, so probe both forms.
        let with_ext = path.with_extension("toml");
        let builder = if path.is_file() {
            builder.add_source(config::File::from(path))
        } else if with_ext.is_file() {
            builder.add_source(config::File::from(with_ext.as_path()))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("MARKETMIND").separator("__"))
            .build()?;

        let config: CopilotConfig = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CopilotResult<()> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CopilotError::InvalidConfig(format!(
                "api_url must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(CopilotError::InvalidConfig(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn capture_command(&self) -> Option<CommandSpec> {
        self.capture_command.as_deref().and_then(CommandSpec::parse)
    }

    pub fn playback_command(&self) -> Option<CommandSpec> {
        self.playback_command.as_deref().and_then(CommandSpec::parse)
    }
}

/// A program plus its leading arguments, split on whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Parse a command line. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Whether the program exists, either as a path or somewhere on `PATH`.
    pub fn is_installed(&self) -> bool {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }
}

//! Conversation history shown in the assistant panel.
//!
//! The transcript is append-only. An assistant answer is appended in one step
//! once its response has arrived, complete with action items; nothing is ever
//! edited in place or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// First message of every session.
pub const GREETING: &str = "Hello! I'm your MarketMind AI assistant. Ask me anything about your retail business - inventory, forecasts, customer feedback, or pricing strategies.";

/// Assistant message appended when the chat endpoint cannot answer.
pub const FALLBACK_TEXT: &str =
    "Sorry, I am currently unavailable. Please ensure the backend is running.";

/// Suggested questions offered before the first submit.
pub const DEFAULT_SUGGESTIONS: [&str; 5] = [
    "What should I restock this week?",
    "Which products are trending?",
    "Summarize customer complaints",
    "What are the pricing recommendations?",
    "Show me inventory risks",
];

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the transcript. Text is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// A user message. Returns `None` if `text` is blank.
    pub fn user(text: &str) -> Option<Self> {
        Self::new(Role::User, text, Vec::new())
    }

    /// An assistant message with its action items. Returns `None` if `text` is blank.
    pub fn assistant(text: &str, action_items: Vec<String>) -> Option<Self> {
        Self::new(Role::Assistant, text, action_items)
    }

    fn new(role: Role, text: &str, action_items: Vec<String>) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            role,
            text: text.to_string(),
            action_items,
            sent_at: Utc::now(),
        })
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Ordered, append-only message history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// A transcript seeded with the assistant greeting.
    pub fn with_greeting() -> Self {
        let mut transcript = Self::default();
        if let Some(greeting) = Message::assistant(GREETING, Vec::new()) {
            transcript.append(greeting);
        }
        transcript
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

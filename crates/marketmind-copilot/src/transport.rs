//! Chat transport: one question in, one answer (plus action items) out.
//!
//! The transport never retries. A failed call is reported once and the
//! controller turns it into the fallback message.

use crate::config::CopilotConfig;
use crate::error::{CopilotError, CopilotResult, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A successful answer from the assistant endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl ChatReply {
    pub fn new(answer: impl Into<String>, action_items: Vec<String>) -> Self {
        Self {
            answer: answer.into(),
            action_items,
        }
    }
}

/// Request/response exchange with the remote assistant.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Ask one non-empty question.
    async fn ask(&self, question: &str) -> Result<ChatReply, TransportError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
}

// Extra fields the backend sends (`context_used`, `error`) are ignored.
#[derive(Deserialize)]
struct ChatResponse {
    answer: Option<String>,
    #[serde(default)]
    action_items: Option<Vec<String>>,
}

/// `POST {api_url}/chat` with `{"question": ...}`; expects
/// `{"answer": ..., "action_items": [...]}` back.
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpChatTransport {
    /// Create a transport for `api_url` (without the `/chat` suffix).
    pub fn new(api_url: &str, timeout: Duration) -> CopilotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CopilotError::TransportSetup(e.to_string()))?;
        Ok(Self {
            endpoint: format!("{}/chat", api_url.trim().trim_end_matches('/')),
            client,
        })
    }

    pub fn from_config(config: &CopilotConfig) -> CopilotResult<Self> {
        Self::new(&config.api_url, config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn ask(&self, question: &str) -> Result<ChatReply, TransportError> {
        debug!(endpoint = %self.endpoint, "asking assistant");

        let res = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { question })
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let body = res.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&body)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        let answer = parsed
            .answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| TransportError::MalformedResponse("missing answer".to_string()))?;

        Ok(ChatReply {
            answer,
            action_items: parsed.action_items.unwrap_or_default(),
        })
    }
}

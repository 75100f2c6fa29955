use crate::config::Config;
use crate::error::ChatError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
}

/// What came back from `POST /chat`, whatever the status
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub status: u16,
    pub reply: Option<String>,
    pub error: Option<String>,
    /// Server-side turn count, when the backend echoes its history
    pub history_len: Option<usize>,
}

impl ChatResponse {
    /// Pull the fields we care about out of any JSON body.
    ///
    /// Fields that are absent or not strings are treated as missing.
    pub fn from_json(status: u16, body: &Value) -> Self {
        let text_field = |name: &str| body.get(name).and_then(Value::as_str).map(str::to_string);

        Self {
            status,
            reply: text_field("reply"),
            error: text_field("error"),
            history_len: body.get("history").and_then(Value::as_array).map(Vec::len),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The reply, if this response is a usable success
    pub fn usable_reply(&self) -> Option<&str> {
        if !self.is_success() {
            return None;
        }
        self.reply.as_deref().filter(|reply| !reply.is_empty())
    }
}

/// The two calls the chat UI makes against its backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one user message. `Err` only when no JSON response was obtained.
    async fn send_chat(&self, message: &str) -> Result<ChatResponse, ChatError>;

    /// Ask the backend to forget the conversation. The response is not inspected.
    async fn reset_history(&self) -> Result<(), ChatError>;
}

/// reqwest-backed client for the chat backend
#[derive(Clone)]
pub struct HttpChatBackend {
    client: reqwest::Client,
    chat_url: String,
    reset_url: String,
}

impl HttpChatBackend {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        // The backend keys its history on a session cookie
        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            chat_url: config.chat_url(),
            reset_url: config.reset_url(),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send_chat(&self, message: &str) -> Result<ChatResponse, ChatError> {
        let request = ChatRequest {
            message: message.to_string(),
        };

        let response = self
            .client
            .post(&self.chat_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| ChatError::Decode(e.to_string()))?;

        let parsed = ChatResponse::from_json(status, &body);
        debug!(
            status,
            has_reply = parsed.reply.is_some(),
            history_len = ?parsed.history_len,
            "chat response"
        );
        Ok(parsed)
    }

    async fn reset_history(&self) -> Result<(), ChatError> {
        let response = self.client.post(&self.reset_url).send().await?;
        debug!(status = response.status().as_u16(), "reset response");
        Ok(())
    }
}

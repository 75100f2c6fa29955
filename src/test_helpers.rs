//! Test doubles shared by unit tests across the crate.

use crate::backend::{ChatBackend, ChatResponse};
use crate::error::ChatError;
use crate::events::{ChatMessage, MessageRole};
use crate::view::ChatView;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Records everything the controller does to the view
#[derive(Default)]
pub struct RecordingView {
    entries: Mutex<Vec<ChatMessage>>,
    input: Mutex<String>,
    send_enabled: Mutex<bool>,
    enabled_changes: Mutex<Vec<bool>>,
    clears: Mutex<usize>,
}

impl RecordingView {
    pub fn with_input(input: &str) -> Arc<Self> {
        let view = Self::default();
        *view.input.lock().unwrap() = input.to_string();
        *view.send_enabled.lock().unwrap() = true;
        Arc::new(view)
    }

    pub fn entries(&self) -> Vec<(MessageRole, String)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|m| (m.role, m.text.clone()))
            .collect()
    }

    pub fn input(&self) -> String {
        self.input.lock().unwrap().clone()
    }

    pub fn send_enabled(&self) -> bool {
        *self.send_enabled.lock().unwrap()
    }

    pub fn enabled_changes(&self) -> Vec<bool> {
        self.enabled_changes.lock().unwrap().clone()
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

impl ChatView for RecordingView {
    fn append_entry(&self, message: ChatMessage) {
        self.entries.lock().unwrap().push(message);
    }

    fn clear_view(&self) {
        self.entries.lock().unwrap().clear();
        *self.clears.lock().unwrap() += 1;
    }

    fn read_input_value(&self) -> String {
        self.input()
    }

    fn set_input_value(&self, value: &str) {
        *self.input.lock().unwrap() = value.to_string();
    }

    fn set_send_enabled(&self, enabled: bool) {
        *self.send_enabled.lock().unwrap() = enabled;
        self.enabled_changes.lock().unwrap().push(enabled);
    }
}

/// What the view looked like when a request reached the backend
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSnapshot {
    pub message: String,
    pub send_enabled: bool,
    pub entries: Vec<(MessageRole, String)>,
}

/// Backend returning canned results, optionally held until released
pub struct StubBackend {
    chat: Result<ChatResponse, ChatError>,
    reset: Result<(), ChatError>,
    observed_view: Option<Arc<RecordingView>>,
    gate: Option<Arc<Notify>>,
    requests: Mutex<Vec<RequestSnapshot>>,
    resets: Mutex<usize>,
}

impl StubBackend {
    pub fn replying(status: u16, body: serde_json::Value) -> Self {
        Self::with_chat(Ok(ChatResponse::from_json(status, &body)))
    }

    pub fn failing(error: ChatError) -> Self {
        Self::with_chat(Err(error.clone())).with_reset(Err(error))
    }

    fn with_chat(chat: Result<ChatResponse, ChatError>) -> Self {
        Self {
            chat,
            reset: Ok(()),
            observed_view: None,
            gate: None,
            requests: Mutex::new(Vec::new()),
            resets: Mutex::new(0),
        }
    }

    pub fn with_reset(mut self, reset: Result<(), ChatError>) -> Self {
        self.reset = reset;
        self
    }

    /// Snapshot this view every time a chat request arrives
    pub fn observing(mut self, view: &Arc<RecordingView>) -> Self {
        self.observed_view = Some(Arc::clone(view));
        self
    }

    /// Hold chat requests until the notify fires
    pub fn gated(mut self, gate: &Arc<Notify>) -> Self {
        self.gate = Some(Arc::clone(gate));
        self
    }

    pub fn requests(&self) -> Vec<RequestSnapshot> {
        self.requests.lock().unwrap().clone()
    }

    pub fn resets(&self) -> usize {
        *self.resets.lock().unwrap()
    }
}

#[async_trait]
impl ChatBackend for StubBackend {
    async fn send_chat(&self, message: &str) -> Result<ChatResponse, ChatError> {
        let snapshot = match &self.observed_view {
            Some(view) => RequestSnapshot {
                message: message.to_string(),
                send_enabled: view.send_enabled(),
                entries: view.entries(),
            },
            None => RequestSnapshot {
                message: message.to_string(),
                send_enabled: true,
                entries: Vec::new(),
            },
        };
        self.requests.lock().unwrap().push(snapshot);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.chat.clone()
    }

    async fn reset_history(&self) -> Result<(), ChatError> {
        *self.resets.lock().unwrap() += 1;
        self.reset.clone()
    }
}

use crate::backend::ChatBackend;
use crate::config::{ResetFailurePolicy, UiLabels};
use crate::error::ChatError;
use crate::events::{ChatMessage, EventBus, MessageRole, Subscription, UiEvent};
use crate::view::ChatView;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Which path a send took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input, or a send was already in flight
    Skipped,
    Replied,
    ServerError,
    TransportError,
}

/// Mediates between UI events and the chat backend.
///
/// Holds no widgets of its own: everything it shows goes through the
/// injected [`ChatView`], and everything it asks goes through the injected
/// [`ChatBackend`].
pub struct ChatController {
    backend: Arc<dyn ChatBackend>,
    view: Arc<dyn ChatView>,
    labels: UiLabels,
    reset_policy: ResetFailurePolicy,
    sending: Arc<AtomicBool>,
}

impl ChatController {
    /// Build a controller. Nothing is subscribed and nothing is sent until
    /// [`ChatController::start`] is called.
    pub fn create(
        backend: Arc<dyn ChatBackend>,
        view: Arc<dyn ChatView>,
        labels: UiLabels,
        reset_policy: ResetFailurePolicy,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            view,
            labels,
            reset_policy,
            sending: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Attach to `bus`. Must be called from inside a tokio runtime; each
    /// event spawns its operation there so the publisher never waits.
    pub fn start(self: &Arc<Self>, bus: &EventBus) -> ControllerHandle {
        let runtime = tokio::runtime::Handle::current();
        let controller = Arc::clone(self);

        let subscription = bus.subscribe(move |event| {
            let controller = Arc::clone(&controller);
            match event {
                UiEvent::SendRequested => {
                    // Input is taken now, at the moment of the key press
                    if let Some(pending) = controller.begin_send() {
                        runtime.spawn(async move {
                            controller.finish_send(pending).await;
                        });
                    }
                }
                UiEvent::ResetRequested => {
                    runtime.spawn(async move {
                        // Already rendered or logged according to the policy
                        let _ = controller.reset_conversation().await;
                    });
                }
            }
        });

        info!("chat controller started");
        ControllerHandle {
            subscriptions: vec![subscription],
        }
    }

    #[allow(dead_code)]
    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    /// Append one entry to the conversation view
    pub fn render_message(&self, role: MessageRole, text: impl Into<String>) {
        self.view.append_entry(ChatMessage::new(role, text));
    }

    /// Send whatever is in the input box.
    ///
    /// The user's text is rendered before the request goes out, and the send
    /// control stays disabled until the request settles, whichever way it
    /// settles.
    pub async fn send_message(&self) -> SendOutcome {
        match self.begin_send() {
            Some(pending) => self.finish_send(pending).await,
            None => SendOutcome::Skipped,
        }
    }

    /// Synchronous half of a send: take the input, render it, clear the
    /// box and enter the sending state. `None` when there is nothing to send
    /// or a send is already in flight.
    fn begin_send(&self) -> Option<PendingSend> {
        let text = self.view.read_input_value().trim().to_string();
        if text.is_empty() {
            return None;
        }
        if self.sending.swap(true, Ordering::SeqCst) {
            return None;
        }
        let guard = SendingGuard {
            sending: Arc::clone(&self.sending),
            view: Arc::clone(&self.view),
        };

        self.render_message(MessageRole::User, text.as_str());
        self.view.set_input_value("");
        self.view.set_send_enabled(false);

        Some(PendingSend {
            text,
            _guard: guard,
        })
    }

    async fn finish_send(&self, pending: PendingSend) -> SendOutcome {
        let text = pending.text.as_str();

        match self.backend.send_chat(text).await {
            Ok(response) => match response.usable_reply() {
                Some(reply) => {
                    info!(status = response.status, "reply received");
                    self.render_message(MessageRole::Assistant, reply);
                    SendOutcome::Replied
                }
                None => {
                    warn!(status = response.status, error = ?response.error, "chat request rejected");
                    let detail = response
                        .error
                        .as_deref()
                        .filter(|error| !error.is_empty())
                        .unwrap_or(self.labels.invalid_response.as_str());
                    self.render_message(
                        MessageRole::Assistant,
                        format!("{}{}", self.labels.error_prefix, detail),
                    );
                    SendOutcome::ServerError
                }
            },
            Err(error) => {
                warn!(%error, "chat request failed");
                self.render_connection_error(&error);
                SendOutcome::TransportError
            }
        }
    }

    /// Ask the backend to drop its history, then clear the view.
    ///
    /// The reset response is never inspected. What happens when the request
    /// itself fails depends on the configured [`ResetFailurePolicy`].
    pub async fn reset_conversation(&self) -> Result<(), ChatError> {
        let result = self.backend.reset_history().await;

        self.view.clear_view();

        match result {
            Err(error) if self.reset_policy == ResetFailurePolicy::Surface => {
                warn!(%error, "history reset failed");
                self.render_connection_error(&error);
                return Err(error);
            }
            Err(error) => warn!(%error, "history reset failed, ignoring"),
            Ok(()) => info!("history reset"),
        }

        self.render_message(MessageRole::Assistant, self.labels.reset_done.as_str());
        Ok(())
    }

    fn render_connection_error(&self, error: &ChatError) {
        self.render_message(
            MessageRole::Assistant,
            format!("{}{}", self.labels.connection_error_prefix, error),
        );
    }
}

/// A send whose input has been taken; the request has not gone out yet
struct PendingSend {
    text: String,
    _guard: SendingGuard,
}

/// Leaves the sending state when dropped, on every exit path
struct SendingGuard {
    sending: Arc<AtomicBool>,
    view: Arc<dyn ChatView>,
}

impl Drop for SendingGuard {
    fn drop(&mut self) {
        self.sending.store(false, Ordering::SeqCst);
        self.view.set_send_enabled(true);
    }
}

/// Live attachment of a controller to an [`EventBus`]
pub struct ControllerHandle {
    subscriptions: Vec<Subscription>,
}

impl ControllerHandle {
    /// Detach from the bus. Requests already in flight still complete.
    pub fn stop(self) {
        drop(self.subscriptions);
        info!("chat controller stopped");
    }
}

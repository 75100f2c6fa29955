use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Events raised by whatever UI is driving the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// The user triggered the send control
    SendRequested,

    /// The user triggered the reset control
    ResetRequested,
}

/// Role of a rendered chat entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            MessageRole::User => "you",
            MessageRole::Assistant => "bot",
        }
    }
}

/// A single rendered entry in the conversation view
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: chrono::Local::now(),
        }
    }

    #[allow(dead_code)]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    #[allow(dead_code)]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text)
    }
}

type Listener = Arc<dyn Fn(&UiEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Registration-based fan-out of [`UiEvent`]s.
///
/// Any number of listeners may subscribe. Each subscription hands back a
/// [`Subscription`] that removes its listener when dropped, so tests can
/// attach and detach handlers per case.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every published event
    #[must_use = "dropping the subscription detaches the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&UiEvent) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver an event to every listener registered right now.
    ///
    /// Listeners are called in registration order and outside the registry
    /// lock. Returns the number of listeners called.
    pub fn publish(&self, event: &UiEvent) -> usize {
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &listeners {
            listener(event);
        }

        listeners.len()
    }

    #[allow(dead_code)]
    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

/// Handle for one registered listener; detaches on drop
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the listener now
    pub fn detach(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(bus: &EventBus, target: UiEvent) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let subscription = bus.subscribe(move |event| {
            if *event == target {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });
        (hits, subscription)
    }

    #[test]
    fn every_listener_receives_published_events() {
        let bus = EventBus::new();
        let (first, _a) = counter(&bus, UiEvent::SendRequested);
        let (second, _b) = counter(&bus, UiEvent::SendRequested);

        assert_eq!(bus.publish(&UiEvent::SendRequested), 2);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_subscription_stops_receiving() {
        let bus = EventBus::new();
        let (hits, subscription) = counter(&bus, UiEvent::ResetRequested);
        assert_eq!(bus.listener_count(), 1);

        drop(subscription);
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.publish(&UiEvent::ResetRequested), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detach_only_removes_its_own_listener() {
        let bus = EventBus::new();
        let (kept, _kept_sub) = counter(&bus, UiEvent::SendRequested);
        let (gone, gone_sub) = counter(&bus, UiEvent::SendRequested);

        gone_sub.detach();
        bus.publish(&UiEvent::SendRequested);

        assert_eq!(kept.load(Ordering::SeqCst), 1);
        assert_eq!(gone.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_subscribe_while_handling() {
        let bus = EventBus::new();
        let inner_bus = bus.clone();
        let late = Arc::new(Mutex::new(Vec::new()));
        let late_handle = Arc::clone(&late);
        let _outer = bus.subscribe(move |_| {
            let sub = inner_bus.subscribe(|_| {});
            late_handle.lock().unwrap().push(sub);
        });

        assert_eq!(bus.publish(&UiEvent::SendRequested), 1);
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn subscription_outliving_bus_is_harmless() {
        let bus = EventBus::new();
        let subscription = bus.subscribe(|_| {});
        drop(bus);
        drop(subscription);
    }
}

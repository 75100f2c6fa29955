use crate::config::UiLabels;
use crate::events::ChatMessage;
use crate::ui::conversation::{ComposerResult, ConversationComposer, ConversationHistory};
use crate::view::ChatView;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};
use std::sync::{Arc, Mutex, MutexGuard};

const SCROLL_STEP: usize = 5;

/// Actions the event loop should take after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Send,
    Reset,
    Exit,
}

/// The whole chat screen: history on top, composer below
#[derive(Clone)]
pub struct ConversationManager {
    history: ConversationHistory,
    composer: ConversationComposer,
}

impl ConversationManager {
    pub fn new(labels: &UiLabels) -> Self {
        Self {
            history: ConversationHistory::new(),
            composer: ConversationComposer::new(
                "Type a message...",
                labels.send.as_str(),
                labels.sending.as_str(),
            ),
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return ConversationAction::Exit,
            KeyCode::Char('c') if ctrl => return ConversationAction::Exit,
            KeyCode::Char('r') if ctrl => return ConversationAction::Reset,
            KeyCode::PageUp => {
                self.history.scroll_up(SCROLL_STEP);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.history.scroll_down(SCROLL_STEP);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            // A disabled send control swallows the press
            ComposerResult::Submitted if self.composer.send_enabled() => ConversationAction::Send,
            _ => ConversationAction::None,
        }
    }

    #[allow(dead_code)]
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    #[allow(dead_code)]
    pub fn composer(&self) -> &ConversationComposer {
        &self.composer
    }
}

impl Widget for ConversationManager {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // History
                Constraint::Length(3), // Composer
            ])
            .split(area);

        self.history.render(chunks[0], buf);
        self.composer.render(chunks[1], buf);
    }
}

/// [`ChatView`] over the shared terminal screen state.
///
/// The controller writes through it from runtime tasks while the event loop
/// reads snapshots to draw and routes key presses into it.
#[derive(Clone)]
pub struct TerminalView {
    state: Arc<Mutex<ConversationManager>>,
}

impl TerminalView {
    pub fn new(labels: &UiLabels) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConversationManager::new(labels))),
        }
    }

    /// Copy of the current screen, for drawing without holding the lock
    pub fn snapshot(&self) -> ConversationManager {
        self.lock().clone()
    }

    pub fn handle_key(&self, key: KeyEvent) -> ConversationAction {
        self.lock().handle_key(key)
    }

    fn lock(&self) -> MutexGuard<'_, ConversationManager> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChatView for TerminalView {
    fn append_entry(&self, message: ChatMessage) {
        self.lock().history.add_message(message);
    }

    fn clear_view(&self) {
        self.lock().history.clear();
    }

    fn read_input_value(&self) -> String {
        self.lock().composer.content().to_string()
    }

    fn set_input_value(&self, value: &str) {
        self.lock().composer.set_content(value);
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.lock().composer.set_send_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResetFailurePolicy;
    use crate::controller::{ChatController, SendOutcome};
    use crate::test_helpers::StubBackend;
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn keys_map_to_actions() {
        let view = TerminalView::new(&UiLabels::default());
        assert_eq!(view.handle_key(key(KeyCode::Char('x'))), ConversationAction::None);
        assert_eq!(view.handle_key(key(KeyCode::Enter)), ConversationAction::Send);
        assert_eq!(view.handle_key(ctrl('r')), ConversationAction::Reset);
        assert_eq!(view.handle_key(ctrl('c')), ConversationAction::Exit);
        assert_eq!(view.handle_key(key(KeyCode::Esc)), ConversationAction::Exit);
        assert_eq!(view.read_input_value(), "x");
    }

    #[test]
    fn enter_does_nothing_while_sending() {
        let view = TerminalView::new(&UiLabels::default());
        view.set_send_enabled(false);
        assert_eq!(view.handle_key(key(KeyCode::Enter)), ConversationAction::None);
        view.set_send_enabled(true);
        assert_eq!(view.handle_key(key(KeyCode::Enter)), ConversationAction::Send);
    }

    #[test]
    fn view_operations_reach_the_widgets() {
        let view = TerminalView::new(&UiLabels::default());
        view.append_entry(ChatMessage::user("one"));
        view.append_entry(ChatMessage::assistant("two"));
        assert_eq!(view.snapshot().history().message_count(), 2);

        view.set_input_value("draft");
        assert_eq!(view.snapshot().composer().content(), "draft");

        view.clear_view();
        assert_eq!(view.snapshot().history().message_count(), 0);
    }

    #[test]
    fn whole_screen_renders_both_panes() {
        let view = TerminalView::new(&UiLabels::default());
        view.append_entry(ChatMessage::assistant("hello from bot"));
        view.set_send_enabled(false);

        let area = Rect::new(0, 0, 50, 12);
        let mut buf = Buffer::empty(area);
        view.snapshot().render(area, &mut buf);

        let screen: String = (0..area.height)
            .map(|y| (0..area.width).map(|x| buf.get(x, y).symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(screen.contains("hello from bot"));
        assert!(screen.contains("Sending..."));
    }

    #[tokio::test]
    async fn controller_drives_the_terminal_view() {
        let view = TerminalView::new(&UiLabels::default());
        let backend = Arc::new(StubBackend::replying(200, json!({"reply": "Hello"})));
        let controller = ChatController::create(
            backend,
            Arc::new(view.clone()),
            UiLabels::default(),
            ResetFailurePolicy::Ignore,
        );

        view.set_input_value("hey");
        assert_eq!(controller.send_message().await, SendOutcome::Replied);

        let screen = view.snapshot();
        let texts: Vec<_> = screen.history().messages().map(|m| m.text.clone()).collect();
        assert_eq!(texts, vec!["hey", "Hello"]);
        assert_eq!(screen.composer().content(), "");
        assert!(screen.composer().send_enabled());
    }
}

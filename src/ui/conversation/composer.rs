use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq, Eq)]
pub enum ComposerResult {
    /// Enter was pressed; the controller reads the content itself
    Submitted,
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Cursor position in chars, not bytes
    pub cursor_position: usize,
}

impl TextAreaState {
    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Single-line input plus the send control
#[derive(Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    send_label: String,
    busy_label: String,
    send_enabled: bool,
}

impl ConversationComposer {
    pub fn new(
        placeholder: impl Into<String>,
        send_label: impl Into<String>,
        busy_label: impl Into<String>,
    ) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder: placeholder.into(),
            send_label: send_label.into(),
            busy_label: busy_label.into(),
            send_enabled: true,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => return ComposerResult::Submitted,
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let at = self.state.byte_index(self.state.cursor_position);
                self.state.content.insert(at, c);
                self.state.cursor_position += 1;
            }
            KeyCode::Backspace => {
                if self.state.cursor_position > 0 {
                    self.state.cursor_position -= 1;
                    let at = self.state.byte_index(self.state.cursor_position);
                    self.state.content.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.state.cursor_position < self.state.char_len() {
                    let at = self.state.byte_index(self.state.cursor_position);
                    self.state.content.remove(at);
                }
            }
            KeyCode::Left => {
                self.state.cursor_position = self.state.cursor_position.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.state.cursor_position < self.state.char_len() {
                    self.state.cursor_position += 1;
                }
            }
            KeyCode::Home => self.state.cursor_position = 0,
            KeyCode::End => self.state.cursor_position = self.state.char_len(),
            _ => {}
        }

        ComposerResult::None
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    /// Replace the content and park the cursor at the end
    pub fn set_content(&mut self, content: &str) {
        self.state.content = content.to_string();
        self.state.cursor_position = self.state.char_len();
    }

    pub fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    pub fn set_send_enabled(&mut self, enabled: bool) {
        self.send_enabled = enabled;
    }

    fn title(&self) -> String {
        if self.send_enabled {
            format!("[ Enter: {} ]", self.send_label)
        } else {
            format!("[ {} ]", self.busy_label)
        }
    }
}

impl Widget for ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .style(if self.send_enabled {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Yellow)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        let line = if self.state.content.is_empty() {
            Line::from(vec![Span::styled(
                self.placeholder.clone(),
                Style::default().fg(Color::DarkGray),
            )])
        } else {
            let at = self.state.byte_index(self.state.cursor_position);
            let mut content = self.state.content.clone();
            content.insert(at, '▌');
            Line::from(vec![Span::raw(content)])
        };
        buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
    }
}

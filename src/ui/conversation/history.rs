//! Conversation history display component

use crate::events::{ChatMessage, MessageRole};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::collections::VecDeque;

/// Conversation history display component
#[derive(Clone)]
pub struct ConversationHistory {
    messages: VecDeque<ChatMessage>,
    /// Lines scrolled up from the bottom; 0 follows the newest entry
    scroll_offset: usize,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            scroll_offset: 0,
        }
    }

    /// Add a new message to the history
    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        self.scroll_to_bottom();
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Clear all messages
    pub fn clear(&mut self) {
        self.messages.clear();
        self.scroll_offset = 0;
    }

    #[allow(dead_code)]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)]
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

impl Widget for ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Conversation");

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.messages.is_empty() {
            let welcome_lines = vec![
                Line::from(vec![Span::styled("No messages yet.", Style::default().fg(Color::Green))]),
                Line::from(vec![Span::raw("")]),
                Line::from(vec![Span::styled(
                    "Enter sends, Ctrl+R resets the history, Esc quits.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];

            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let mut all_lines: Vec<Line> = Vec::new();
        for message in self.messages.iter() {
            all_lines.append(&mut render_message(message, inner_area.width));
            all_lines.push(Line::from(vec![Span::raw("")]));
        }
        // No spacer after the newest entry
        all_lines.pop();

        // Bottom-anchored window, shifted up by the scroll offset
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let offset = self.scroll_offset.min(total.saturating_sub(height));
        let end = total - offset;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Render a single message into lines
fn render_message(message: &ChatMessage, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let role_icon = match message.role {
        MessageRole::User => "👤",
        MessageRole::Assistant => "🤖",
    };
    let timestamp = message.timestamp.format("%H:%M:%S");
    let header = format!("{} {} {}", role_icon, timestamp, "─".repeat(20));
    lines.push(Line::from(vec![Span::styled(
        header,
        Style::default().fg(Color::DarkGray),
    )]));

    let style = content_style(message.role);
    for content_line in wrap_text(&message.text, width.saturating_sub(2) as usize) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, style),
        ]));
    }

    lines
}

fn content_style(role: MessageRole) -> Style {
    match role {
        MessageRole::User => Style::default().fg(Color::Blue),
        MessageRole::Assistant => Style::default().fg(Color::Green),
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Word-wrap `text` to `width` columns, keeping explicit line breaks.
/// Words wider than a line are broken across lines.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.chars().count();
            if word_width > width {
                if current_width > 0 {
                    lines.push(std::mem::take(&mut current_line));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(width).peekable();
                while let Some(chunk) = chunks.next() {
                    if chunks.peek().is_some() {
                        lines.push(chunk.iter().collect());
                    } else {
                        current_line = chunk.iter().collect();
                        current_width = chunk.len();
                    }
                }
                continue;
            }
            if current_width > 0 && current_width + word_width + 1 > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }
            current_line.push_str(word);
            current_width += word_width;
        }

        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

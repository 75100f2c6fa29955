//! The surface the controller renders into.
//!
//! The controller never touches widgets directly; it is handed something
//! implementing [`ChatView`] at construction time. The terminal UI provides
//! one, the one-shot CLI commands use [`ConsoleView`], and tests use a
//! recording double.

use crate::events::ChatMessage;
use std::io::{self, Write};
use std::sync::Mutex;

pub trait ChatView: Send + Sync {
    /// Append one entry and bring it into view
    fn append_entry(&self, message: ChatMessage);

    /// Remove every rendered entry
    fn clear_view(&self);

    fn read_input_value(&self) -> String;

    fn set_input_value(&self, value: &str);

    /// Enable or disable the send control. Disabled means a send is in flight.
    fn set_send_enabled(&self, enabled: bool);
}

/// Line-oriented view writing entries to stdout
pub struct ConsoleView {
    input: Mutex<String>,
}

impl ConsoleView {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: Mutex::new(input.into()),
        }
    }

    fn print(line: &str) {
        let mut stdout = io::stdout().lock();
        // Nothing useful to do if stdout is gone
        let _ = writeln!(stdout, "{line}");
    }
}

impl ChatView for ConsoleView {
    fn append_entry(&self, message: ChatMessage) {
        Self::print(&format!("{}> {}", message.role.display_name(), message.text));
    }

    fn clear_view(&self) {
        Self::print(&"-".repeat(40));
    }

    fn read_input_value(&self) -> String {
        self.input
            .lock()
            .map(|input| input.clone())
            .unwrap_or_default()
    }

    fn set_input_value(&self, value: &str) {
        if let Ok(mut input) = self.input.lock() {
            *input = value.to_string();
        }
    }

    fn set_send_enabled(&self, _enabled: bool) {}
}

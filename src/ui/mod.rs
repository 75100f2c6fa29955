pub mod conversation;

use crate::events::{EventBus, UiEvent};
use anyhow::Result;
use conversation::{ConversationAction, TerminalView};
use crossterm::{
    cursor::Show as ShowCursor,
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, stdout};
use std::time::Duration;
use tracing::info;

const TICK: Duration = Duration::from_millis(50);

/// Restores the terminal however the loop exits
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), LeaveAlternateScreen, ShowCursor);
    }
}

/// Run the interactive chat screen until the user quits.
///
/// Key presses become [`UiEvent`]s on `bus`; whoever is subscribed (the
/// controller) writes back into `view`, which is redrawn every tick.
pub async fn run_tui(view: TerminalView, bus: &EventBus) -> Result<()> {
    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    info!("terminal ui started");
    let result = run_loop(&mut terminal, &view, bus).await;

    terminal.show_cursor()?;
    info!("terminal ui stopped");
    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    view: &TerminalView,
    bus: &EventBus,
) -> Result<()> {
    loop {
        let screen = view.snapshot();
        terminal.draw(|frame| frame.render_widget(screen, frame.size()))?;

        // Polling blocks; keep it off the async workers
        let ready = tokio::task::block_in_place(|| event::poll(TICK))?;
        if !ready {
            tokio::task::yield_now().await;
            continue;
        }

        if let Event::Key(key) = event::read()? {
            match view.handle_key(key) {
                ConversationAction::Send => {
                    bus.publish(&UiEvent::SendRequested);
                }
                ConversationAction::Reset => {
                    bus.publish(&UiEvent::ResetRequested);
                }
                ConversationAction::Exit => return Ok(()),
                ConversationAction::None => {}
            }
        }
    }
}

mod backend;
mod config;
mod controller;
mod error;
mod events;
mod ui;
mod view;

#[cfg(test)]
mod test_helpers;

use anyhow::{Context, Result};
use backend::HttpChatBackend;
use clap::{Parser, Subcommand};
use config::{Config, Overrides, ResetFailurePolicy};
use controller::{ChatController, SendOutcome};
use events::EventBus;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use ui::conversation::TerminalView;
use view::ConsoleView;

#[derive(Parser)]
#[command(name = "chatpane")]
#[command(version)]
#[command(about = "Terminal chat client for a /chat + /reset_history backend", long_about = None)]
struct Cli {
    /// Backend root URL (overrides config and CHATPANE_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// What to do when the reset request fails: ignore | surface
    #[arg(long, global = true)]
    reset_policy: Option<ResetFailurePolicy>,

    /// Config file (default: ~/.chatpane/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Send { message: String },
    /// Reset the server-side conversation history
    Reset,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(
        cli.config.as_deref(),
        Overrides {
            base_url: cli.base_url,
            reset_failure_policy: cli.reset_policy,
        },
    )?;

    match cli.command {
        None => {
            init_logging(Some(&config.log_path()?))?;
            run_interactive(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Send { message }) => {
            init_logging(None)?;
            let controller = one_shot_controller(&config, &message)?;
            match controller.send_message().await {
                SendOutcome::Replied => Ok(ExitCode::SUCCESS),
                _ => Ok(ExitCode::FAILURE),
            }
        }
        Some(Commands::Reset) => {
            init_logging(None)?;
            let controller = one_shot_controller(&config, "")?;
            match controller.reset_conversation().await {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(_) => Ok(ExitCode::FAILURE),
            }
        }
    }
}

async fn run_interactive(config: Config) -> Result<()> {
    let backend = Arc::new(HttpChatBackend::new(&config)?);
    let view = TerminalView::new(&config.labels);
    let controller = ChatController::create(
        backend,
        Arc::new(view.clone()),
        config.labels.clone(),
        config.reset_failure_policy,
    );

    let bus = EventBus::new();
    let handle = controller.start(&bus);
    let result = ui::run_tui(view, &bus).await;
    handle.stop();
    result
}

fn one_shot_controller(config: &Config, input: &str) -> Result<Arc<ChatController>> {
    let backend = Arc::new(HttpChatBackend::new(config)?);
    Ok(ChatController::create(
        backend,
        Arc::new(ConsoleView::new(input)),
        config.labels.clone(),
        config.reset_failure_policy,
    ))
}

/// TUI mode logs to a file so the screen stays clean; one-shot mode to stderr
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(env_filter(default_log_level(true)))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(default_log_level(false)))
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Level used when `RUST_LOG` is unset. One-shot output shares the
/// terminal with the printed reply, so it only shows warnings.
fn default_log_level(interactive: bool) -> &'static str {
    if interactive { "info" } else { "warn" }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

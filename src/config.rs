use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

pub const BASE_URL_ENV: &str = "CHATPANE_BASE_URL";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Root URL of the chat backend
    pub base_url: String,

    /// Path of the chat endpoint, relative to `base_url`
    pub chat_path: String,

    /// Path of the history reset endpoint, relative to `base_url`
    pub reset_path: String,

    /// Client-side request timeout. Unset means wait on the transport.
    pub request_timeout_secs: Option<u64>,

    /// What to do when the reset request itself fails
    pub reset_failure_policy: ResetFailurePolicy,

    /// Where TUI mode writes its log
    pub log_file: Option<PathBuf>,

    /// User-facing strings
    pub labels: UiLabels,
}

/// How a failed `/reset_history` call is treated
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResetFailurePolicy {
    /// Clear the view and confirm the reset anyway; only log the failure
    #[default]
    Ignore,
    /// Clear the view and show the failure instead of the confirmation
    Surface,
}

/// Text shown by the UI and embedded in rendered error messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiLabels {
    pub send: String,
    pub sending: String,
    pub error_prefix: String,
    pub invalid_response: String,
    pub connection_error_prefix: String,
    pub reset_done: String,
}

impl Default for UiLabels {
    fn default() -> Self {
        Self {
            send: "Send".to_string(),
            sending: "Sending...".to_string(),
            error_prefix: "Error: ".to_string(),
            invalid_response: "Invalid response".to_string(),
            connection_error_prefix: "Connection error: ".to_string(),
            reset_done: "History reset.".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://127.0.0.1:5000".to_string(),
            chat_path: "/chat".to_string(),
            reset_path: "/reset_history".to_string(),
            request_timeout_secs: None,
            reset_failure_policy: ResetFailurePolicy::default(),
            log_file: None,
            labels: UiLabels::default(),
        }
    }
}

/// Values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub reset_failure_policy: Option<ResetFailurePolicy>,
}

impl Config {
    /// Directory holding config and logs (`~/.chatpane`)
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".chatpane"))
    }

    /// Load configuration from `path`, or `~/.chatpane/config.toml` when none
    /// is given, then apply the environment and command-line overrides
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::home_dir()?.join("config.toml"),
        };

        let mut config = Self::from_file(&config_path)?;
        config.apply_overrides(std::env::var(BASE_URL_ENV).ok(), overrides);
        Ok(config)
    }

    /// Parse a config file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Environment first, then command line, so the flag wins
    pub fn apply_overrides(&mut self, env_base_url: Option<String>, overrides: Overrides) {
        if let Some(url) = env_base_url.filter(|url| !url.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(url) = overrides.base_url {
            self.base_url = url;
        }
        if let Some(policy) = overrides.reset_failure_policy {
            self.reset_failure_policy = policy;
        }
    }

    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    pub fn reset_url(&self) -> String {
        join_url(&self.base_url, &self.reset_path)
    }

    /// Log file for TUI mode, defaulting to `~/.chatpane/chatpane.log`
    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join("chatpane.log")),
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

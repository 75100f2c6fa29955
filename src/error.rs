use thiserror::Error;

/// Failures talking to the chat backend that never produced a usable response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    /// The request could not complete (connection refused, DNS, timeout...)
    #[error("{0}")]
    Transport(String),

    /// The server answered but the body was not the JSON we expect
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ChatError::Decode(error.to_string())
        } else {
            ChatError::Transport(error.to_string())
        }
    }
}

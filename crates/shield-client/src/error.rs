//! Error types for shield clients.
//!
//! Nothing here is fatal to a running client. Push failures are retried by
//! the reconnect loop, poll failures by the next interval, and malformed push
//! frames are dropped. Only claim rejections reach the user.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server refused the claim because someone holds the shield
    #[error("{detail}")]
    AlreadyClaimed { detail: String },

    /// Any other non-2xx response
    #[error("request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// HTTP request failed (a failed poll is one of these)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Push connection could not be opened or was lost
    #[error("Transport error: {0}")]
    Transport(String),

    /// Push frame did not parse
    #[error("Malformed push message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    /// Bad configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Server-provided reason for a rejected request.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::AlreadyClaimed { detail } | Error::Rejected { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

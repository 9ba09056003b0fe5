//! Error types for the shield server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shield_protocol::ErrorBody;
use thiserror::Error;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in server operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Someone already holds the shield
    #[error("Shield already triggered by {holder}.")]
    AlreadyClaimed { holder: String },

    /// Claim submitted without a usable name
    #[error("Name is required.")]
    InvalidName,

    /// Bad configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::AlreadyClaimed { .. } => StatusCode::CONFLICT,
            Error::InvalidName => StatusCode::BAD_REQUEST,
            Error::Config(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

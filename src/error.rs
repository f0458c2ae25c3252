//! Error types for the search gateway.
//!
//! Every failure in the request path terminates the request with one of these
//! variants. Messages are built from field names and upstream status text only;
//! the caller's API key is never interpolated into them.

use axum::http::StatusCode;
use thiserror::Error;

/// Gateway error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A required request field is missing or blank.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The embedding model failed on the given text.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The vector store answered with a non-success status.
    #[error("Vector store rejected the query ({status}): {message}")]
    Downstream {
        /// HTTP status returned by the vector store.
        status: u16,
        /// Response body or reason phrase reported by the vector store.
        message: String,
    },

    /// The vector store could not be reached or its reply could not be read.
    #[error("Vector store transport error: {0}")]
    Transport(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP server or client-side API failure.
    #[error("API error: {0}")]
    Api(String),
}

impl Error {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Encoding(_) => "encoding_error",
            Error::Downstream { .. } | Error::Transport(_) => "downstream_error",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Api(_) => "api_error",
        }
    }

    /// HTTP status reported to the caller for this error.
    ///
    /// Downstream statuses are mirrored when they are valid error codes so the
    /// caller sees the vector store's verdict (401 for a bad key, 400 for a
    /// malformed filter, ...).
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Downstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Error::Transport(_) => StatusCode::BAD_GATEWAY,
            Error::Encoding(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Api(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the dockrune console

use thiserror::Error;

/// Main error type for the console
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Socket error: {0}")]
    SocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Action already in progress: {0}")]
    Busy(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// True for failures caused by a rejected or missing credential
    pub fn is_auth(&self) -> bool {
        matches!(self, ConsoleError::AuthError(_))
    }

    /// True for failures caused by the record being absent on the server
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConsoleError::NotFound(_))
    }
}

impl From<url::ParseError> for ConsoleError {
    fn from(err: url::ParseError) -> Self {
        ConsoleError::ConfigError(format!("Invalid URL: {}", err))
    }
}

impl From<anyhow::Error> for ConsoleError {
    fn from(err: anyhow::Error) -> Self {
        ConsoleError::Internal(err.to_string())
    }
}

use crate::storage::StorageError;
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// Non-2xx response from the backend, carrying the server message.
    #[error("{message}")]
    Remote {
        /// HTTP status code of the response.
        status: u16,
        /// Server-supplied (or fallback) message.
        message: String,
    },

    /// Network failure or malformed response body.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response missing data the contract requires.
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistence bootstrap error (opening the data directory).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    /// Whether this is a 401 from the backend (wrong credentials).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Remote { status: 401, .. })
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;

//! Error types for pixel-media

use thiserror::Error;

/// Media error type
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transport failure talking to an upstream service
    #[error("network error: {0}")]
    Network(String),

    /// Upstream service answered with an error status
    #[error("upstream error ({status}): {message}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// File system error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if retrying may succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::Network(_) => "network_error",
            Self::Upstream { .. } => "upstream_error",
            Self::Io(_) => "io_error",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result type alias for media operations
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for pixel-canvas
//!
//! This module provides error types for the editor session system,
//! including storage, ownership, quota and restore errors.

use pixel_core::access::AccessDenial;
use pixel_core::geometry::GeometryError;
use thiserror::Error;
use uuid::Uuid;

/// Canvas error type
#[derive(Debug, Error)]
pub enum Error {
    /// Project not found
    #[error("project not found: {0}")]
    ProjectNotFound(Uuid),

    /// User not found
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Editor session not found
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// Caller does not own the project
    #[error("access denied")]
    AccessDenied(Uuid),

    /// Plan gate refused the action
    #[error(transparent)]
    Plan(#[from] AccessDenial),

    /// Invalid geometry request
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Snapshot could not be loaded into the canvas
    #[error("restore failed: {0}")]
    Restore(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a database error
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Check if error is recoverable
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Restore(_))
    }

    /// Check if the caller should be routed to an upgrade prompt
    #[must_use]
    pub fn wants_upgrade(&self) -> bool {
        matches!(self, Self::Plan(denial) if denial.wants_upgrade())
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "project_not_found",
            Self::UserNotFound(_) => "user_not_found",
            Self::SessionNotFound(_) => "session_not_found",
            Self::AccessDenied(_) => "access_denied",
            Self::Plan(denial) => denial.code(),
            Self::Geometry(_) | Self::InvalidInput(_) => "invalid_input",
            Self::Restore(_) => "restore_failed",
            Self::Database(_) => "database_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for canvas operations
pub type Result<T> = std::result::Result<T, Error>;

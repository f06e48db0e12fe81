//! # AppError
//!
//! Centralized error handling for the content graph.
//! Every repository and service operation returns one of these variants.

use thiserror::Error;

/// The primary error type for all cg-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., post, comment, parent comment)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The supplied cursor does not match any element of the paginated scope
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// Validation failure (e.g., empty or oversized comment)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The post author switched comments off
    #[error("comments are disabled for post {0}")]
    CommentsDisabled(String),

    /// Infrastructure failure (e.g., DB down, connection reset)
    #[error("backend failure: {0}")]
    Backend(#[source] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        AppError::NotFound(entity.to_string(), id.into())
    }

    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        AppError::Backend(err.into())
    }
}

/// A specialized Result type for content-graph logic.
pub type Result<T> = std::result::Result<T, AppError>;

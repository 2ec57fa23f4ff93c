//! Alert engine error types

use thiserror::Error;

/// Result type for alert engine operations
pub type Result<T> = std::result::Result<T, AlertError>;

/// Alert engine errors
///
/// Payloads are plain strings so one error value can be handed to every
/// caller waiting on the same map render.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AlertError {
    /// Upstream alert source unreachable or malformed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Replace/mark/unmark/read failed at the storage layer
    #[error("Storage error: {0}")]
    Storage(String),

    /// Subscriber already tracks the area
    #[error("Subscriber {subscriber_id} already tracks {area}")]
    AlreadyTracking { subscriber_id: i64, area: String },

    /// Outbound message could not be delivered
    #[error("Send error: {0}")]
    Send(String),

    /// Map rendering failed (rasterizer missing, template unreadable, empty output, upload)
    #[error("Render error: {0}")]
    Render(String),

    /// A bounded slot is occupied
    #[error("Busy: {0}")]
    Busy(String),

    /// Operation exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid construction parameters
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AlertError {
    /// Expected, user-facing conditions that should not be logged as errors
    pub fn is_expected(&self) -> bool {
        matches!(self, AlertError::AlreadyTracking { .. } | AlertError::Busy(_))
    }

    /// Failures a requester can simply retry later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AlertError::Fetch(_)
                | AlertError::Storage(_)
                | AlertError::Send(_)
                | AlertError::Render(_)
                | AlertError::Timeout(_)
        )
    }
}

impl From<sqlx::Error> for AlertError {
    fn from(err: sqlx::Error) -> Self {
        AlertError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for AlertError {
    fn from(err: std::io::Error) -> Self {
        AlertError::Render(err.to_string())
    }
}

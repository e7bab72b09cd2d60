//! Error types for sqlcapture

use crate::hook::HookHandle;
use thiserror::Error;

/// Result type alias for sqlcapture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error types for capture, aggregation and hooked execution
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A statement arrived after the session was finished
    #[error("Session closed: finish() already done, capture not possible any more")]
    SessionClosed,

    /// `finish()` was called on a session that is already finished
    #[error("Session already finished")]
    AlreadyFinished,

    /// Aggregation or reporting was requested while the session is still active
    #[error("Session not finished: call finish() first")]
    NotFinished,

    /// Unrecognized grouping dimension name
    #[error("Invalid dimension '{0}', valid are: kind, table, kind_and_table")]
    InvalidDimension(String),

    /// Statement lookup by 1-based sequence index outside `[1, count]`
    #[error("Statement index {index} out of range 1..={count}")]
    RowIndexOutOfRange { index: usize, count: usize },

    /// A hook handle was removed twice or never registered
    #[error("Hook {0} is not registered")]
    HookNotRegistered(HookHandle),

    /// A hook refused to let the statement execute
    #[error("Statement aborted by hook: {0}")]
    Aborted(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Connection could not be set up
    #[error("Connection error: {0}")]
    Connection(String),
}

impl CaptureError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an aborted error
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }

    /// Check if this error comes from misuse of the session lifecycle
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::SessionClosed | Self::AlreadyFinished | Self::NotFinished
        )
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error was raised by the database
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

//! Run-level errors.
//!
//! Resource-level failures never surface here; they become outcome records.
//! A [`ReconcileError`] means the run could not produce a complete report.

use lodestar_core::BackendError;
use thiserror::Error;

/// Result type alias for reconciliation runs.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A configuration or authentication failure stopped the run.
    #[error("Run aborted: {0}")]
    Aborted(#[source] BackendError),

    #[error("Failed to encode resource body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    Task(String),
}

impl ReconcileError {
    /// The backend failure that stopped the run, if any.
    #[must_use]
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::Aborted(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BackendError> for ReconcileError {
    fn from(e: BackendError) -> Self {
        Self::Aborted(e)
    }
}

impl From<tokio::task::JoinError> for ReconcileError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

//! Error types for the in-memory store.

use frostbook_core::{LedgerError, StoreError};
use frostbook_shared::AppError;
use thiserror::Error;

/// Errors raised while recording currencies, accounts, modifiers or entries.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The store refused the write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The record breaks a ledger rule.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Store(inner) => inner.into(),
            RecordError::Ledger(inner) => inner.into(),
        }
    }
}

/// Errors raised while reading or writing a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be read or written.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not a valid snapshot.
    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// A record in the snapshot was rejected.
    #[error(transparent)]
    Record(#[from] RecordError),
}

impl From<SnapshotError> for AppError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Io(_) => Self::Internal(err.to_string()),
            SnapshotError::Json(_) => Self::Validation(err.to_string()),
            SnapshotError::Record(inner) => inner.into(),
        }
    }
}

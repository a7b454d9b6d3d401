//! Error types for the record store and execution log.

use thiserror::Error;

/// Main error type for store and log operations.
///
/// A missing backing file is deliberately not represented here: for
/// [`RecordStore::load`](crate::RecordStore::load) and
/// [`AppendLog::tail`](crate::AppendLog::tail) absence of the file is the
/// valid empty state, not a failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    StoreIo(#[source] std::io::Error),

    #[error("log IO error: {0}")]
    LogIo(#[source] std::io::Error),

    #[error("corrupt store document: {0}")]
    CorruptStore(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),
}

/// Result type for store and log operations.
pub type Result<T> = std::result::Result<T, StoreError>;

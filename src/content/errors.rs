use sled::transaction::TransactionError;
use thiserror::Error;

/// Errors that can arise while interacting with the content and progress store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around JSON errors (seed files, API payloads).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, seed files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// A package cost exceeds what the player holds.
    #[error("insufficient items: item {item_id} needs {required}, player has {available}")]
    InsufficientItems {
        item_id: u32,
        required: i64,
        available: i64,
    },

    /// Record failed a basic shape check before being written.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Write conflicts with existing state (duplicate username, bad transition).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal error (unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TransactionError<StoreError>> for StoreError {
    fn from(err: TransactionError<StoreError>) -> Self {
        match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(e) => StoreError::Sled(e),
        }
    }
}

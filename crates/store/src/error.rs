//! Store error types.

use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored event row carries an event kind outside the vocabulary.
    #[error("Unknown event kind in store: {0}")]
    UnknownEventKind(String),

    /// A stored projection row carries a status outside the vocabulary.
    #[error("Unknown order status in store: {0}")]
    UnknownStatus(String),

    /// The unit of work was already committed or rolled back.
    #[error("Transaction already closed")]
    TransactionClosed,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

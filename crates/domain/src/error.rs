//! Domain error types.

use common::OrderId;
use store::StoreError;
use thiserror::Error;

use crate::publisher::PublishError;

/// Errors that can occur while handling an order command.
#[derive(Debug, Error)]
pub enum DomainError {
    /// CREATE_ORDER for an order that already has a projection row.
    #[error("Order {0} already exists")]
    AlreadyExists(OrderId),

    /// A lifecycle command for an order that was never created.
    #[error("Order {0} not found")]
    NotFound(OrderId),

    /// An error occurred in the persistence layer.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The committed event could not be handed to the downstream stream.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

//! Shared types for the order command/event processing engine.

pub mod types;

pub use types::{EventKind, OrderId, OrderStatus};

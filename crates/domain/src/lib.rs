//! Domain layer for the order command/event processing engine.
//!
//! This crate provides:
//! - the inbound command vocabulary and its wire decoding
//! - the [`EventPublisher`] port for the downstream event stream
//! - [`OrderCommandService`], which validates commands against the current
//!   projection and records the resulting transition

pub mod command;
pub mod error;
pub mod publisher;
pub mod service;

pub use command::{
    CancelOrder, CommandParseError, CreateOrder, MarkPaid, OrderCommand, ShipOrder,
};
pub use error::{DomainError, Result};
pub use publisher::{EventEnvelope, EventPublisher, PublishError, RecordingPublisher};
pub use service::OrderCommandService;

//! Persistence layer for the order engine.
//!
//! This crate provides:
//! - record types for the append-only event log and the status projection
//! - [`OrderEventRepository`] and [`OrderStateRepository`] traits
//! - the [`UnitOfWork`] transactional scope binding both repositories
//! - a PostgreSQL implementation ([`PgStore`]) and an in-memory twin
//!   ([`MemoryStore`]) for tests

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod uow;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use record::{OrderEventRecord, OrderStateRecord};
pub use uow::{OrderEventRepository, OrderStateRepository, UnitOfWork, UnitOfWorkFactory};

//! Worker process internals: configuration, Kafka adapters and the
//! sequential consumer loop.

pub mod config;
pub mod error;
pub mod kafka;
pub mod source;

pub use config::Config;
pub use error::WorkerError;
pub use source::{CommandSource, SourceError, run_commands};

//! Worker error types.

use domain::{CommandParseError, DomainError};
use thiserror::Error;

/// Failure to process one inbound command message.
///
/// These errors are logged by the consumer loop and the message is skipped;
/// they never stop the loop.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The message body could not be decoded into a command.
    #[error("Command decode error: {0}")]
    Decode(#[from] CommandParseError),

    /// The command was decoded but rejected by the domain.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

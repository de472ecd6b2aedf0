//! Inbound command stream and the sequential consumer loop.

use async_trait::async_trait;
use domain::{OrderCommand, OrderCommandService};
use thiserror::Error;

use crate::error::WorkerError;

/// Failure of the underlying message transport.
///
/// Unlike [`WorkerError`], a source error is fatal to the loop.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A Kafka client error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Any other transport failure.
    #[error("Stream error: {0}")]
    Stream(String),
}

/// One logical inbound command stream with an explicit durable cursor.
#[async_trait]
pub trait CommandSource: Send {
    /// Pulls the next raw message, or `None` once the stream is exhausted.
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, SourceError>;

    /// Durably advances the read cursor past the last pulled message.
    async fn commit_cursor(&mut self) -> Result<(), SourceError>;

    /// Releases the stream resource.
    async fn close(&mut self);
}

/// Runs the consumer loop until the source is exhausted.
///
/// Commands are handled strictly one at a time: the next pull does not start
/// until the current command's full pipeline (transaction commit and
/// downstream publish) has returned. The cursor advances after every message
/// whether or not handling succeeded, so a failing command is logged and
/// skipped permanently rather than redelivered.
///
/// The source is closed on every exit path, including a fatal transport
/// error.
pub async fn run_commands<S: CommandSource>(
    mut source: S,
    service: &OrderCommandService,
) -> Result<(), SourceError> {
    let result = consume(&mut source, service).await;
    source.close().await;
    result
}

async fn consume<S: CommandSource>(
    source: &mut S,
    service: &OrderCommandService,
) -> Result<(), SourceError> {
    while let Some(raw) = source.next_message().await? {
        match dispatch(&raw, service).await {
            Ok(()) => {
                metrics::counter!("orders_commands_processed").increment(1);
            }
            Err(error) => {
                tracing::error!(%error, "command failed, skipping");
                metrics::counter!("orders_commands_failed").increment(1);
            }
        }
        source.commit_cursor().await?;
    }
    Ok(())
}

async fn dispatch(raw: &[u8], service: &OrderCommandService) -> Result<(), WorkerError> {
    match OrderCommand::from_bytes(raw)? {
        Some(command) => service.handle(command).await?,
        None => tracing::debug!("ignoring command with unrecognized type"),
    }
    Ok(())
}

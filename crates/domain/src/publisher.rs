//! Outbound event publishing port.

use std::sync::Arc;

use async_trait::async_trait;
use common::{EventKind, OrderId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

/// Wire envelope published to the downstream events topic.
///
/// Messages are keyed by `order_id` so events for one order stay on one
/// partition in append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub order_id: OrderId,
    pub payload: Value,
}

/// Failure to hand an event to the downstream stream.
#[derive(Debug, Error)]
#[error("Failed to publish {kind}: {message}")]
pub struct PublishError {
    pub kind: &'static str,
    pub message: String,
}

impl PublishError {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind: kind.as_str(),
            message: message.into(),
        }
    }
}

/// Downstream sink for committed domain events.
///
/// `publish_event` returns only once the broker has accepted the message, so
/// the caller can treat success as accepted-for-delivery.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_event(
        &self,
        kind: EventKind,
        order_id: &OrderId,
        payload: &Value,
    ) -> std::result::Result<(), PublishError>;
}

/// Publisher that records envelopes in memory, for tests.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    published: Arc<RwLock<Vec<EventEnvelope>>>,
}

impl RecordingPublisher {
    /// Creates a new publisher with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded envelopes in publish order.
    pub async fn published(&self) -> Vec<EventEnvelope> {
        self.published.read().await.clone()
    }

    /// Returns the most recently recorded envelope.
    pub async fn last(&self) -> Option<EventEnvelope> {
        self.published.read().await.last().cloned()
    }

    /// Returns the number of recorded envelopes.
    pub async fn count(&self) -> usize {
        self.published.read().await.len()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish_event(
        &self,
        kind: EventKind,
        order_id: &OrderId,
        payload: &Value,
    ) -> std::result::Result<(), PublishError> {
        self.published.write().await.push(EventEnvelope {
            kind,
            order_id: order_id.clone(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

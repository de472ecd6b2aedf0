//! rdkafka adapters for the command source and the event publisher.

use std::time::Duration;

use async_trait::async_trait;
use common::{EventKind, OrderId};
use domain::{EventEnvelope, EventPublisher, PublishError};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::config::Config;
use crate::source::{CommandSource, SourceError};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Command stream backed by a Kafka consumer group.
///
/// Offsets are committed only through [`commit_cursor`], never automatically,
/// so the durable cursor advances exactly when the loop says so.
///
/// [`commit_cursor`]: CommandSource::commit_cursor
pub struct KafkaCommandSource {
    consumer: StreamConsumer,
}

impl KafkaCommandSource {
    /// Creates the consumer and subscribes to the commands topic.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_bootstrap)
            .set("client.id", &config.service_name)
            .set("group.id", config.group_id())
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;
        consumer.subscribe(&[config.commands_topic.as_str()])?;
        Ok(Self { consumer })
    }
}

#[async_trait]
impl CommandSource for KafkaCommandSource {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let message = self.consumer.recv().await?;
        Ok(Some(message.payload().unwrap_or_default().to_vec()))
    }

    async fn commit_cursor(&mut self) -> Result<(), SourceError> {
        self.consumer.commit_consumer_state(CommitMode::Sync)?;
        Ok(())
    }

    async fn close(&mut self) {
        self.consumer.unsubscribe();
    }
}

/// Publishes committed order events to the downstream events topic.
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaEventPublisher {
    /// Creates the producer for the events topic.
    pub fn from_config(config: &Config) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_bootstrap)
            .set("client.id", &config.service_name)
            .set("message.timeout.ms", "5000")
            .create()?;
        Ok(Self {
            producer,
            topic: config.events_topic.clone(),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish_event(
        &self,
        kind: EventKind,
        order_id: &OrderId,
        payload: &serde_json::Value,
    ) -> Result<(), PublishError> {
        let envelope = EventEnvelope {
            kind,
            order_id: order_id.clone(),
            payload: payload.clone(),
        };
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| PublishError::new(kind, e.to_string()))?;

        // Keyed by order id so events for one order stay in append order.
        let record = FutureRecord::to(&self.topic)
            .key(order_id.as_str())
            .payload(&body);

        self.producer
            .send(record, Timeout::After(SEND_TIMEOUT))
            .await
            .map_err(|(e, _)| PublishError::new(kind, e.to_string()))?;

        tracing::debug!(
            topic = %self.topic,
            key = %order_id,
            event = kind.as_str(),
            "published event"
        );
        Ok(())
    }
}

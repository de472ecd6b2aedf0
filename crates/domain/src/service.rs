//! Order command service: the state machine behind the command stream.
//!
//! Each command is validated against the current projection inside one
//! unit-of-work scope; on success exactly one event is appended and the
//! projection row is upserted in the same transaction, then the event is
//! published downstream after the commit.

use std::sync::Arc;

use common::{EventKind, OrderId};
use serde_json::{Value, json};
use store::{UnitOfWork, UnitOfWorkFactory};

use crate::command::{CancelOrder, CreateOrder, MarkPaid, OrderCommand, ShipOrder};
use crate::error::{DomainError, Result};
use crate::publisher::EventPublisher;

/// Service applying ordering commands to the persisted order state machine.
pub struct OrderCommandService {
    store: Arc<dyn UnitOfWorkFactory>,
    publisher: Arc<dyn EventPublisher>,
}

impl OrderCommandService {
    /// Creates a service over a unit-of-work factory and an event publisher.
    pub fn new(store: Arc<dyn UnitOfWorkFactory>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Applies one command, or fails without leaving a partial write.
    #[tracing::instrument(
        skip(self, command),
        fields(command = command.name(), order_id = %command.order_id())
    )]
    pub async fn handle(&self, command: OrderCommand) -> Result<()> {
        match command {
            OrderCommand::Create(cmd) => self.handle_create(cmd).await,
            OrderCommand::Cancel(cmd) => self.handle_cancel(cmd).await,
            OrderCommand::MarkPaid(cmd) => self.handle_mark_paid(cmd).await,
            OrderCommand::Ship(cmd) => self.handle_ship(cmd).await,
        }
    }

    async fn handle_create(&self, cmd: CreateOrder) -> Result<()> {
        let payload = json!({
            "order_id": &cmd.order_id,
            "item": cmd.item,
            "amount": cmd.amount,
            "currency": cmd.currency,
        });

        let mut uow = self.store.begin().await?;
        if uow.state().get_state(&cmd.order_id).await?.is_some() {
            // Dropping the scope rolls the transaction back.
            return Err(DomainError::AlreadyExists(cmd.order_id));
        }
        self.commit_transition(uow, &cmd.order_id, EventKind::OrderCreated, payload)
            .await
    }

    async fn handle_cancel(&self, cmd: CancelOrder) -> Result<()> {
        let payload = json!({
            "order_id": &cmd.order_id,
            "reason": cmd.reason,
        });
        self.transition_existing(&cmd.order_id, EventKind::OrderCancelled, payload)
            .await
    }

    async fn handle_mark_paid(&self, cmd: MarkPaid) -> Result<()> {
        let payload = json!({
            "order_id": &cmd.order_id,
            "paid_at": cmd.paid_at,
        });
        self.transition_existing(&cmd.order_id, EventKind::OrderPaid, payload)
            .await
    }

    async fn handle_ship(&self, cmd: ShipOrder) -> Result<()> {
        let payload = json!({
            "order_id": &cmd.order_id,
            "shipped_at": cmd.shipped_at,
        });
        self.transition_existing(&cmd.order_id, EventKind::OrderShipped, payload)
            .await
    }

    /// Shared path for commands that require the order to exist.
    ///
    /// Only existence is checked, not the current status: a cancelled order
    /// can still be marked paid or shipped.
    async fn transition_existing(
        &self,
        order_id: &OrderId,
        kind: EventKind,
        payload: Value,
    ) -> Result<()> {
        let mut uow = self.store.begin().await?;
        if uow.state().get_state(order_id).await?.is_none() {
            return Err(DomainError::NotFound(order_id.clone()));
        }
        self.commit_transition(uow, order_id, kind, payload).await
    }

    /// Appends the event and projects the new status in one transaction,
    /// then publishes the committed event.
    ///
    /// The publish happens outside the transaction: a publish failure leaves
    /// the committed state in place.
    async fn commit_transition(
        &self,
        mut uow: Box<dyn UnitOfWork>,
        order_id: &OrderId,
        kind: EventKind,
        payload: Value,
    ) -> Result<()> {
        uow.events()
            .append_event(order_id, kind, payload.clone())
            .await?;
        uow.state().upsert_state(order_id, kind.status()).await?;
        uow.commit().await?;

        self.publisher
            .publish_event(kind, order_id, &payload)
            .await?;
        metrics::counter!("orders_events_published").increment(1);

        tracing::debug!(event = kind.as_str(), "order transition committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::OrderStatus;
    use store::MemoryStore;

    use super::*;
    use crate::publisher::RecordingPublisher;

    fn service_over(
        store: &MemoryStore,
        publisher: &RecordingPublisher,
    ) -> OrderCommandService {
        OrderCommandService::new(Arc::new(store.clone()), Arc::new(publisher.clone()))
    }

    fn create_command(order_id: &str) -> OrderCommand {
        OrderCommand::Create(CreateOrder {
            order_id: OrderId::new(order_id),
            item: Some("book".to_string()),
            amount: Some(json!(10)),
            currency: Some("USD".to_string()),
        })
    }

    #[tokio::test]
    async fn create_order_appends_projects_and_publishes() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::new();
        let service = service_over(&store, &publisher);
        let order_id = OrderId::new("1");

        service.handle(create_command("1")).await.unwrap();

        assert_eq!(
            store.state_of(&order_id).await.unwrap().status,
            OrderStatus::Created
        );
        let events = store.events_for(&order_id).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::OrderCreated);

        let envelope = publisher.last().await.unwrap();
        assert_eq!(envelope.kind, EventKind::OrderCreated);
        assert_eq!(envelope.payload["item"], json!("book"));
    }

    #[tokio::test]
    async fn duplicate_create_fails_and_writes_nothing() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::new();
        let service = service_over(&store, &publisher);
        let order_id = OrderId::new("1");

        service.handle(create_command("1")).await.unwrap();
        let err = service.handle(create_command("1")).await.unwrap_err();

        assert!(matches!(err, DomainError::AlreadyExists(_)));
        assert_eq!(
            store.state_of(&order_id).await.unwrap().status,
            OrderStatus::Created
        );
        assert_eq!(store.events_for(&order_id).await.len(), 1);
        assert_eq!(publisher.count().await, 1);
    }

    #[tokio::test]
    async fn lifecycle_command_on_unknown_order_fails() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::new();
        let service = service_over(&store, &publisher);
        let order_id = OrderId::new("missing");

        for command in [
            OrderCommand::Cancel(CancelOrder {
                order_id: order_id.clone(),
                reason: None,
            }),
            OrderCommand::MarkPaid(MarkPaid {
                order_id: order_id.clone(),
                paid_at: None,
            }),
            OrderCommand::Ship(ShipOrder {
                order_id: order_id.clone(),
                shipped_at: None,
            }),
        ] {
            let err = service.handle(command).await.unwrap_err();
            assert!(matches!(err, DomainError::NotFound(_)));
        }

        assert_eq!(store.event_count().await, 0);
        assert!(store.state_of(&order_id).await.is_none());
        assert_eq!(publisher.count().await, 0);
    }

    #[tokio::test]
    async fn mark_paid_then_ship_reaches_shipped() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::new();
        let service = service_over(&store, &publisher);
        let order_id = OrderId::new("42");

        service.handle(create_command("42")).await.unwrap();

        service
            .handle(OrderCommand::MarkPaid(MarkPaid {
                order_id: order_id.clone(),
                paid_at: Some("t".to_string()),
            }))
            .await
            .unwrap();
        service
            .handle(OrderCommand::Ship(ShipOrder {
                order_id: order_id.clone(),
                shipped_at: Some("t2".to_string()),
            }))
            .await
            .unwrap();

        assert_eq!(
            store.state_of(&order_id).await.unwrap().status,
            OrderStatus::Shipped
        );
        let events = store.events_for(&order_id).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].kind, EventKind::OrderPaid);
        assert_eq!(events[2].kind, EventKind::OrderShipped);
        assert_eq!(
            publisher.last().await.unwrap().kind,
            EventKind::OrderShipped
        );
    }

    #[tokio::test]
    async fn cancel_records_reason_in_payload() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::new();
        let service = service_over(&store, &publisher);
        let order_id = OrderId::new("1");

        service.handle(create_command("1")).await.unwrap();
        service
            .handle(OrderCommand::Cancel(CancelOrder {
                order_id: order_id.clone(),
                reason: Some("changed mind".to_string()),
            }))
            .await
            .unwrap();

        let envelope = publisher.last().await.unwrap();
        assert_eq!(envelope.kind, EventKind::OrderCancelled);
        assert_eq!(envelope.payload["reason"], json!("changed mind"));
        assert_eq!(
            store.state_of(&order_id).await.unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn shipping_a_cancelled_order_is_permitted() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::new();
        let service = service_over(&store, &publisher);
        let order_id = OrderId::new("1");

        service.handle(create_command("1")).await.unwrap();
        service
            .handle(OrderCommand::Cancel(CancelOrder {
                order_id: order_id.clone(),
                reason: None,
            }))
            .await
            .unwrap();
        service
            .handle(OrderCommand::Ship(ShipOrder {
                order_id: order_id.clone(),
                shipped_at: None,
            }))
            .await
            .unwrap();

        assert_eq!(
            store.state_of(&order_id).await.unwrap().status,
            OrderStatus::Shipped
        );
    }

    #[tokio::test]
    async fn absent_optional_fields_serialize_as_null() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::new();
        let service = service_over(&store, &publisher);

        service
            .handle(OrderCommand::Create(CreateOrder {
                order_id: OrderId::new("1"),
                item: None,
                amount: None,
                currency: None,
            }))
            .await
            .unwrap();

        let envelope = publisher.last().await.unwrap();
        assert_eq!(envelope.payload["item"], Value::Null);
        assert_eq!(envelope.payload["amount"], Value::Null);
        assert_eq!(envelope.payload["currency"], Value::Null);
    }
}

//! Repository traits and the transactional unit of work.

use async_trait::async_trait;
use common::{EventKind, OrderId, OrderStatus};
use serde_json::Value;

use crate::{OrderEventRecord, OrderStateRecord, Result};

/// Append-only access to the order event log.
///
/// Implementations must be bound to a live transaction so that appends
/// become durable only when the surrounding [`UnitOfWork`] commits.
#[async_trait]
pub trait OrderEventRepository: Send {
    /// Appends one event, assigning its sequence id and timestamp.
    ///
    /// Returns the stored record including the assigned fields.
    async fn append_event(
        &mut self,
        order_id: &OrderId,
        kind: EventKind,
        payload: Value,
    ) -> Result<OrderEventRecord>;

    /// Returns the full history for one order in assignment order.
    ///
    /// An order with no events yields an empty vector, not an error.
    async fn load_events(&mut self, order_id: &OrderId) -> Result<Vec<OrderEventRecord>>;
}

/// Keyed access to the current-status projection.
#[async_trait]
pub trait OrderStateRepository: Send {
    /// Returns the projection row for an order, or `None` if never created.
    async fn get_state(&mut self, order_id: &OrderId) -> Result<Option<OrderStateRecord>>;

    /// Creates or overwrites the projection row for an order.
    ///
    /// Idempotent with respect to the stored value: repeating the call with
    /// the same status leaves the row's status unchanged.
    async fn upsert_state(
        &mut self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<OrderStateRecord>;
}

/// Transactional scope binding one event append and one projection write.
///
/// Writes issued through [`events`](UnitOfWork::events) and
/// [`state`](UnitOfWork::state) become durable together on
/// [`commit`](UnitOfWork::commit) or are discarded together. Dropping an
/// uncommitted scope rolls back; the underlying transactional resource is
/// released on every exit path.
#[async_trait]
pub trait UnitOfWork: Send {
    /// The event log repository bound to this scope.
    fn events(&mut self) -> &mut dyn OrderEventRepository;

    /// The projection repository bound to this scope.
    fn state(&mut self) -> &mut dyn OrderStateRepository;

    /// Durably persists all writes issued through this scope.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards all writes issued through this scope.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Opens fresh [`UnitOfWork`] scopes against a backing store.
///
/// Each scope exclusively owns one transactional session; scopes are never
/// shared across concurrently handled commands.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

//! In-memory store implementation for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{EventKind, OrderId, OrderStatus};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::uow::{OrderEventRepository, OrderStateRepository, UnitOfWork, UnitOfWorkFactory};
use crate::{OrderEventRecord, OrderStateRecord, Result};

#[derive(Default)]
struct MemoryInner {
    events: Vec<OrderEventRecord>,
    states: HashMap<OrderId, OrderStateRecord>,
    next_sequence: i64,
}

/// In-memory store with the same transactional semantics as [`PgStore`].
///
/// Each unit-of-work scope stages its writes privately and applies them to
/// the shared maps on commit; a dropped or rolled-back scope leaves the
/// shared state untouched.
///
/// [`PgStore`]: crate::PgStore
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of committed events.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }

    /// Returns the committed history for one order, in assignment order.
    pub async fn events_for(&self, order_id: &OrderId) -> Vec<OrderEventRecord> {
        self.inner
            .read()
            .await
            .events
            .iter()
            .filter(|e| &e.order_id == order_id)
            .cloned()
            .collect()
    }

    /// Returns the committed projection row for one order.
    pub async fn state_of(&self, order_id: &OrderId) -> Option<OrderStateRecord> {
        self.inner.read().await.states.get(order_id).cloned()
    }

    /// Clears all committed events and projection rows.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.events.clear();
        inner.states.clear();
        inner.next_sequence = 0;
    }
}

#[async_trait]
impl UnitOfWorkFactory for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            events: MemoryEventRepository {
                shared: self.inner.clone(),
                staged: Vec::new(),
            },
            state: MemoryStateRepository {
                shared: self.inner.clone(),
                staged: HashMap::new(),
            },
        }))
    }
}

struct MemoryUnitOfWork {
    events: MemoryEventRepository,
    state: MemoryStateRepository,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn events(&mut self) -> &mut dyn OrderEventRepository {
        &mut self.events
    }

    fn state(&mut self) -> &mut dyn OrderStateRepository {
        &mut self.state
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut inner = self.events.shared.write().await;
        inner.events.extend(self.events.staged);
        for (order_id, record) in self.state.staged {
            inner.states.insert(order_id, record);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Staged writes are simply dropped with the scope.
        Ok(())
    }
}

struct MemoryEventRepository {
    shared: Arc<RwLock<MemoryInner>>,
    staged: Vec<OrderEventRecord>,
}

#[async_trait]
impl OrderEventRepository for MemoryEventRepository {
    async fn append_event(
        &mut self,
        order_id: &OrderId,
        kind: EventKind,
        payload: Value,
    ) -> Result<OrderEventRecord> {
        // Sequence ids are reserved eagerly, so a rolled-back scope leaves a
        // gap, matching the BIGSERIAL column.
        let sequence_id = {
            let mut inner = self.shared.write().await;
            inner.next_sequence += 1;
            inner.next_sequence
        };

        let record = OrderEventRecord {
            sequence_id,
            order_id: order_id.clone(),
            kind,
            payload,
            created_at: Utc::now(),
        };
        self.staged.push(record.clone());
        Ok(record)
    }

    async fn load_events(&mut self, order_id: &OrderId) -> Result<Vec<OrderEventRecord>> {
        let inner = self.shared.read().await;
        let mut events: Vec<_> = inner
            .events
            .iter()
            .filter(|e| &e.order_id == order_id)
            .cloned()
            .collect();
        events.extend(
            self.staged
                .iter()
                .filter(|e| &e.order_id == order_id)
                .cloned(),
        );
        Ok(events)
    }
}

struct MemoryStateRepository {
    shared: Arc<RwLock<MemoryInner>>,
    staged: HashMap<OrderId, OrderStateRecord>,
}

#[async_trait]
impl OrderStateRepository for MemoryStateRepository {
    async fn get_state(&mut self, order_id: &OrderId) -> Result<Option<OrderStateRecord>> {
        if let Some(record) = self.staged.get(order_id) {
            return Ok(Some(record.clone()));
        }
        Ok(self.shared.read().await.states.get(order_id).cloned())
    }

    async fn upsert_state(
        &mut self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<OrderStateRecord> {
        let record = OrderStateRecord {
            order_id: order_id.clone(),
            status,
            updated_at: Utc::now(),
        };
        self.staged.insert(order_id.clone(), record.clone());
        Ok(record)
    }
}

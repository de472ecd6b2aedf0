//! PostgreSQL-backed store implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventKind, OrderId, OrderStatus};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::sync::Mutex;

use crate::uow::{OrderEventRepository, OrderStateRepository, UnitOfWork, UnitOfWorkFactory};
use crate::{OrderEventRecord, OrderStateRecord, Result, StoreError};

/// Transaction shared between the two repositories of one scope.
///
/// The option is taken on commit/rollback; any later use of the scope fails
/// with `TransactionClosed`.
type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// PostgreSQL store; opens one transaction per unit-of-work scope.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::debug!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl UnitOfWorkFactory for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx: SharedTx = Arc::new(Mutex::new(Some(self.pool.begin().await?)));
        Ok(Box::new(PgUnitOfWork {
            events: PgOrderEventRepository { tx: tx.clone() },
            state: PgOrderStateRepository { tx: tx.clone() },
            tx,
        }))
    }
}

/// Unit of work backed by one `sqlx` transaction.
///
/// If the scope is dropped without committing, the transaction rolls back
/// when it is returned to the pool.
pub struct PgUnitOfWork {
    tx: SharedTx,
    events: PgOrderEventRepository,
    state: PgOrderStateRepository,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn events(&mut self) -> &mut dyn OrderEventRepository {
        &mut self.events
    }

    fn state(&mut self) -> &mut dyn OrderStateRepository {
        &mut self.state
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or(StoreError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}

struct PgOrderEventRepository {
    tx: SharedTx,
}

fn row_to_event(row: PgRow) -> Result<OrderEventRecord> {
    let kind: String = row.try_get("kind")?;
    let kind = EventKind::parse(&kind).ok_or(StoreError::UnknownEventKind(kind))?;

    Ok(OrderEventRecord {
        sequence_id: row.try_get("sequence_id")?,
        order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
        kind,
        payload: row.try_get("payload")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_state(row: PgRow) -> Result<OrderStateRecord> {
    let status: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status).ok_or(StoreError::UnknownStatus(status))?;

    Ok(OrderStateRecord {
        order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
        status,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl OrderEventRepository for PgOrderEventRepository {
    async fn append_event(
        &mut self,
        order_id: &OrderId,
        kind: EventKind,
        payload: Value,
    ) -> Result<OrderEventRecord> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::TransactionClosed)?;

        let row = sqlx::query(
            r#"
            INSERT INTO order_events (order_id, kind, payload)
            VALUES ($1, $2, $3)
            RETURNING sequence_id, created_at
            "#,
        )
        .bind(order_id.as_str())
        .bind(kind.as_str())
        .bind(&payload)
        .fetch_one(&mut **tx)
        .await?;

        Ok(OrderEventRecord {
            sequence_id: row.try_get("sequence_id")?,
            order_id: order_id.clone(),
            kind,
            payload,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn load_events(&mut self, order_id: &OrderId) -> Result<Vec<OrderEventRecord>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::TransactionClosed)?;

        let rows = sqlx::query(
            r#"
            SELECT sequence_id, order_id, kind, payload, created_at
            FROM order_events
            WHERE order_id = $1
            ORDER BY sequence_id ASC
            "#,
        )
        .bind(order_id.as_str())
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(row_to_event).collect()
    }
}

struct PgOrderStateRepository {
    tx: SharedTx,
}

#[async_trait]
impl OrderStateRepository for PgOrderStateRepository {
    async fn get_state(&mut self, order_id: &OrderId) -> Result<Option<OrderStateRecord>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::TransactionClosed)?;

        let row = sqlx::query(
            r#"
            SELECT order_id, status, updated_at
            FROM order_states
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        row.map(row_to_state).transpose()
    }

    async fn upsert_state(
        &mut self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<OrderStateRecord> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::TransactionClosed)?;

        let row = sqlx::query(
            r#"
            INSERT INTO order_states (order_id, status, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (order_id)
            DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            RETURNING order_id, status, updated_at
            "#,
        )
        .bind(order_id.as_str())
        .bind(status.as_str())
        .fetch_one(&mut **tx)
        .await?;

        row_to_state(row)
    }
}

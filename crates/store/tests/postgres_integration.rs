//! PostgreSQL integration tests.
//!
//! These tests share one PostgreSQL container; run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use common::{EventKind, OrderId, OrderStatus};
use serde_json::json;
use serial_test::serial;
use sqlx::PgPool;
use store::{PgStore, UnitOfWork, UnitOfWorkFactory};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Apply the schema with raw_sql to execute multiple statements
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_order_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PgStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_events, order_states")
        .execute(&pool)
        .await
        .unwrap();

    PgStore::new(pool)
}

fn fresh_order_id() -> OrderId {
    OrderId::new(Uuid::new_v4().to_string())
}

#[tokio::test]
#[serial]
async fn append_assigns_increasing_sequence_ids() {
    let store = get_test_store().await;
    let order_id = fresh_order_id();

    let mut uow = store.begin().await.unwrap();
    let first = uow
        .events()
        .append_event(&order_id, EventKind::OrderCreated, json!({"item": "book"}))
        .await
        .unwrap();
    let second = uow
        .events()
        .append_event(&order_id, EventKind::OrderPaid, json!({"paid_at": "t"}))
        .await
        .unwrap();
    uow.commit().await.unwrap();

    assert!(second.sequence_id > first.sequence_id);
    assert_eq!(first.order_id, order_id);
    assert_eq!(first.kind, EventKind::OrderCreated);
}

#[tokio::test]
#[serial]
async fn load_events_returns_history_in_order() {
    let store = get_test_store().await;
    let order_id = fresh_order_id();

    let mut uow = store.begin().await.unwrap();
    for kind in [
        EventKind::OrderCreated,
        EventKind::OrderPaid,
        EventKind::OrderShipped,
    ] {
        uow.events()
            .append_event(&order_id, kind, json!({}))
            .await
            .unwrap();
    }
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let events = uow.events().load_events(&order_id).await.unwrap();
    uow.rollback().await.unwrap();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].kind, EventKind::OrderCreated);
    assert_eq!(events[1].kind, EventKind::OrderPaid);
    assert_eq!(events[2].kind, EventKind::OrderShipped);
    assert!(events[0].sequence_id < events[1].sequence_id);
}

#[tokio::test]
#[serial]
async fn load_events_for_unknown_order_is_empty() {
    let store = get_test_store().await;

    let mut uow = store.begin().await.unwrap();
    let events = uow
        .events()
        .load_events(&fresh_order_id())
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
#[serial]
async fn upsert_creates_then_overwrites_row() {
    let store = get_test_store().await;
    let order_id = fresh_order_id();

    let mut uow = store.begin().await.unwrap();
    let created = uow
        .state()
        .upsert_state(&order_id, OrderStatus::Created)
        .await
        .unwrap();
    assert_eq!(created.status, OrderStatus::Created);
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let shipped = uow
        .state()
        .upsert_state(&order_id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let state = uow.state().get_state(&order_id).await.unwrap().unwrap();
    assert_eq!(state.status, OrderStatus::Shipped);
}

#[tokio::test]
#[serial]
async fn upsert_with_same_status_is_idempotent() {
    let store = get_test_store().await;
    let order_id = fresh_order_id();

    let mut uow = store.begin().await.unwrap();
    uow.state()
        .upsert_state(&order_id, OrderStatus::Created)
        .await
        .unwrap();
    uow.state()
        .upsert_state(&order_id, OrderStatus::Created)
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let state = uow.state().get_state(&order_id).await.unwrap().unwrap();
    assert_eq!(state.status, OrderStatus::Created);
}

#[tokio::test]
#[serial]
async fn commit_persists_event_and_state_together() {
    let store = get_test_store().await;
    let order_id = fresh_order_id();

    let mut uow = store.begin().await.unwrap();
    uow.events()
        .append_event(&order_id, EventKind::OrderCreated, json!({"item": "book"}))
        .await
        .unwrap();
    uow.state()
        .upsert_state(&order_id, OrderStatus::Created)
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let events = uow.events().load_events(&order_id).await.unwrap();
    let state = uow.state().get_state(&order_id).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(state.unwrap().status, OrderStatus::Created);
}

#[tokio::test]
#[serial]
async fn rollback_discards_event_and_state_together() {
    let store = get_test_store().await;
    let order_id = fresh_order_id();

    let mut uow = store.begin().await.unwrap();
    uow.events()
        .append_event(&order_id, EventKind::OrderCreated, json!({}))
        .await
        .unwrap();
    uow.state()
        .upsert_state(&order_id, OrderStatus::Created)
        .await
        .unwrap();
    uow.rollback().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let events = uow.events().load_events(&order_id).await.unwrap();
    let state = uow.state().get_state(&order_id).await.unwrap();

    assert!(events.is_empty());
    assert!(state.is_none());
}

#[tokio::test]
#[serial]
async fn dropped_scope_rolls_back() {
    let store = get_test_store().await;
    let order_id = fresh_order_id();

    {
        let mut uow = store.begin().await.unwrap();
        uow.events()
            .append_event(&order_id, EventKind::OrderCreated, json!({}))
            .await
            .unwrap();
        // Scope dropped without commit.
    }

    let mut uow = store.begin().await.unwrap();
    let events = uow.events().load_events(&order_id).await.unwrap();
    assert!(events.is_empty());
}

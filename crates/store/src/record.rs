//! Stored record types.

use chrono::{DateTime, Utc};
use common::{EventKind, OrderId, OrderStatus};
use serde::{Deserialize, Serialize};

/// One immutable entry in the order event log.
///
/// `sequence_id` and `created_at` are assigned by the store on append.
/// Records are never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEventRecord {
    /// Store-assigned, monotonically increasing ordering key.
    pub sequence_id: i64,

    /// The order this event belongs to.
    pub order_id: OrderId,

    /// Which transition this event records.
    pub kind: EventKind,

    /// Event-specific JSON payload.
    pub payload: serde_json::Value,

    /// When the store accepted the event.
    pub created_at: DateTime<Utc>,
}

/// Current-status projection row, one per order.
///
/// Derived from the event log: the status always reflects the most recently
/// committed event for the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStateRecord {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

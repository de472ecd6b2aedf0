use serde::{Deserialize, Serialize};

/// Identifier of an order, supplied by the upstream gateway.
///
/// Wraps the canonical string form. Wire values may arrive as JSON strings
/// or numbers; deserialization coerces numbers to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order ID from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string form of the ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = OrderId;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a string or number order id")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<OrderId, E> {
                Ok(OrderId::new(v))
            }

            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<OrderId, E> {
                Ok(OrderId(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<OrderId, E> {
                Ok(OrderId(v.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<OrderId, E> {
                Ok(OrderId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Current lifecycle status of an order.
///
/// Every status corresponds to exactly one event kind; the projection never
/// holds a status without a matching event in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Cancelled,
    Paid,
    Shipped,
}

impl OrderStatus {
    /// Returns the stored string form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
        }
    }

    /// Parses the stored string form, returning `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(OrderStatus::Created),
            "cancelled" => Some(OrderStatus::Cancelled),
            "paid" => Some(OrderStatus::Paid),
            "shipped" => Some(OrderStatus::Shipped),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vocabulary of domain events appended to the order log and republished
/// downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "ORDER_CREATED")]
    OrderCreated,
    #[serde(rename = "ORDER_CANCELLED")]
    OrderCancelled,
    #[serde(rename = "ORDER_PAID")]
    OrderPaid,
    #[serde(rename = "ORDER_SHIPPED")]
    OrderShipped,
}

impl EventKind {
    /// Returns the wire/stored name of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderCreated => "ORDER_CREATED",
            EventKind::OrderCancelled => "ORDER_CANCELLED",
            EventKind::OrderPaid => "ORDER_PAID",
            EventKind::OrderShipped => "ORDER_SHIPPED",
        }
    }

    /// Parses the wire/stored name, returning `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ORDER_CREATED" => Some(EventKind::OrderCreated),
            "ORDER_CANCELLED" => Some(EventKind::OrderCancelled),
            "ORDER_PAID" => Some(EventKind::OrderPaid),
            "ORDER_SHIPPED" => Some(EventKind::OrderShipped),
            _ => None,
        }
    }

    /// The projection status an order reaches when this event is applied.
    pub fn status(&self) -> OrderStatus {
        match self {
            EventKind::OrderCreated => OrderStatus::Created,
            EventKind::OrderCancelled => OrderStatus::Cancelled,
            EventKind::OrderPaid => OrderStatus::Paid,
            EventKind::OrderShipped => OrderStatus::Shipped,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

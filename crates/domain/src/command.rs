//! Inbound command vocabulary and wire decoding.

use common::OrderId;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A decoded ordering command from the command stream.
#[derive(Debug, Clone)]
pub enum OrderCommand {
    Create(CreateOrder),
    Cancel(CancelOrder),
    MarkPaid(MarkPaid),
    Ship(ShipOrder),
}

/// Command to create a new order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    pub order_id: OrderId,
    #[serde(default)]
    pub item: Option<String>,
    /// Opaque amount as sent by the gateway (integer or decimal).
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Command to cancel an existing order.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Command to mark an existing order as paid.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkPaid {
    pub order_id: OrderId,
    #[serde(default)]
    pub paid_at: Option<String>,
}

/// Command to mark an existing order as shipped.
#[derive(Debug, Clone, Deserialize)]
pub struct ShipOrder {
    pub order_id: OrderId,
    #[serde(default)]
    pub shipped_at: Option<String>,
}

/// Errors decoding a raw stream message into a command.
#[derive(Debug, Error)]
pub enum CommandParseError {
    /// The message body is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The message is valid JSON but not an object.
    #[error("Command is not a JSON object")]
    NotAnObject,

    /// The object has no string `type` field.
    #[error("Command is missing the type field")]
    MissingType,

    /// The type is known but required fields are missing or malformed.
    #[error("Malformed {command} command: {source}")]
    Malformed {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl OrderCommand {
    /// Decodes a raw message body.
    ///
    /// Returns `Ok(None)` for a well-formed command whose `type` is outside
    /// the vocabulary: such commands are dropped without error.
    pub fn from_bytes(raw: &[u8]) -> Result<Option<Self>, CommandParseError> {
        let value: Value = serde_json::from_slice(raw)?;
        Self::from_json(&value)
    }

    /// Decodes a parsed JSON value. Same contract as [`from_bytes`](Self::from_bytes).
    pub fn from_json(value: &Value) -> Result<Option<Self>, CommandParseError> {
        let object = value.as_object().ok_or(CommandParseError::NotAnObject)?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CommandParseError::MissingType)?;

        fn decode<T: serde::de::DeserializeOwned>(
            command: &'static str,
            value: &Value,
        ) -> Result<T, CommandParseError> {
            serde_json::from_value(value.clone())
                .map_err(|source| CommandParseError::Malformed { command, source })
        }

        let command = match kind {
            "CREATE_ORDER" => OrderCommand::Create(decode("CREATE_ORDER", value)?),
            "CANCEL_ORDER" => OrderCommand::Cancel(decode("CANCEL_ORDER", value)?),
            "MARK_PAID" => OrderCommand::MarkPaid(decode("MARK_PAID", value)?),
            "SHIP_ORDER" => OrderCommand::Ship(decode("SHIP_ORDER", value)?),
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    /// The wire name of the command type.
    pub fn name(&self) -> &'static str {
        match self {
            OrderCommand::Create(_) => "CREATE_ORDER",
            OrderCommand::Cancel(_) => "CANCEL_ORDER",
            OrderCommand::MarkPaid(_) => "MARK_PAID",
            OrderCommand::Ship(_) => "SHIP_ORDER",
        }
    }

    /// The order this command addresses.
    pub fn order_id(&self) -> &OrderId {
        match self {
            OrderCommand::Create(cmd) => &cmd.order_id,
            OrderCommand::Cancel(cmd) => &cmd.order_id,
            OrderCommand::MarkPaid(cmd) => &cmd.order_id,
            OrderCommand::Ship(cmd) => &cmd.order_id,
        }
    }
}

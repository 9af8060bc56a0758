//! Order updates streamed on the private `orders` channel.
//!
//! The streaming session hands the trading layer the raw `data` array of
//! each push; `decode_order_batch` turns it into `OrderUpdate` records.

use crate::order::{OrderSide, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// One order-status change pushed by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    /// Exchange-assigned order ID.
    pub order_id: String,
    /// Instrument (symbol) the order belongs to.
    pub inst_id: String,
    /// Client-assigned order ID, if any.
    #[serde(default, rename = "clientOid", alias = "clientOId")]
    pub client_oid: Option<String>,
    pub side: OrderSide,
    pub status: OrderStatus,
    /// Limit price.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Decimal,
    /// Order size in instrument units.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub size: Decimal,
    /// Average fill price so far.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price_avg: Decimal,
    /// Cumulative filled size.
    #[serde(default, rename = "accBaseVolume", deserialize_with = "lenient_decimal")]
    pub filled_size: Decimal,
    /// Last update time in milliseconds.
    #[serde(default, rename = "uTime", deserialize_with = "lenient_millis")]
    pub updated_at_ms: i64,
}

impl OrderUpdate {
    /// A buy order that is now completely filled.
    pub fn is_buy_fill(&self) -> bool {
        self.status == OrderStatus::Filled && self.side == OrderSide::Buy
    }

    /// A sell order that is now completely filled.
    pub fn is_sell_fill(&self) -> bool {
        self.status == OrderStatus::Filled && self.side == OrderSide::Sell
    }
}

/// Decode the `data` payload of an `orders` push.
///
/// The payload is a JSON array of order records. A single object is accepted
/// as a batch of one.
pub fn decode_order_batch(payload: &[u8]) -> Result<Vec<OrderUpdate>, serde_json::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Batch {
        Many(Vec<OrderUpdate>),
        One(OrderUpdate),
    }

    match serde_json::from_slice::<Batch>(payload)? {
        Batch::Many(updates) => Ok(updates),
        Batch::One(update) => Ok(vec![update]),
    }
}

/// Decimal sent as a string (possibly empty) or a number.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    let text = match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    };
    if text.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }
    text.trim()
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(text.trim()))
        .map_err(serde::de::Error::custom)
}

/// Millisecond timestamp sent as a string or a number.
fn lenient_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.is_empty() => Ok(0),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

//! Bitget API response types.

use crate::error::BitgetRestError;
use execution_core::{OpenOrder, OrderSide, OrderStatus, Position};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Envelope code for a successful call.
pub const SUCCESS_CODE: &str = "00000";

/// Envelope wrapping every Bitget REST response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub request_time: Option<i64>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the payload, turning a non-success code into an error.
    pub fn into_data(self) -> Result<T, BitgetRestError> {
        if self.code != SUCCESS_CODE {
            return Err(BitgetRestError::classify_api_error(self.code, self.msg));
        }
        self.data
            .ok_or_else(|| BitgetRestError::NoData(format!("empty data ({})", self.msg)))
    }
}

/// Element of GET /api/v2/mix/market/ticker.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TickerRaw {
    pub symbol: String,
    #[serde(rename = "lastPr", deserialize_with = "deserialize_decimal_from_str")]
    pub last_price: Decimal,
}

/// Element of GET /api/v2/mix/position/single-position.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PositionRaw {
    pub symbol: String,
    #[serde(default)]
    pub hold_side: String,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub open_price_avg: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub total: Decimal,
    #[serde(default, deserialize_with = "deserialize_decimal_from_str")]
    pub available: Decimal,
}

impl From<PositionRaw> for Position {
    fn from(raw: PositionRaw) -> Self {
        Position {
            symbol: raw.symbol,
            hold_side: raw.hold_side,
            open_price_avg: raw.open_price_avg,
            total: raw.total,
            available: raw.available,
        }
    }
}

/// Data of POST /api/v2/mix/order/place-order and cancel-order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderAck {
    pub order_id: String,
    #[serde(default)]
    pub client_oid: Option<String>,
}

/// Data of GET /api/v2/mix/order/orders-pending.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PendingOrdersData {
    /// Null when nothing is pending.
    #[serde(default)]
    pub entrusted_list: Option<Vec<PendingOrderRaw>>,
    #[serde(default)]
    pub end_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PendingOrderRaw {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub price: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub size: Decimal,
}

impl From<PendingOrderRaw> for OpenOrder {
    fn from(raw: PendingOrderRaw) -> Self {
        OpenOrder {
            order_id: raw.order_id,
            symbol: raw.symbol,
            side: raw.side,
            status: raw.status,
            price: raw.price,
            size: raw.size,
        }
    }
}

/// Bitget sends decimals as strings, sometimes empty.
fn deserialize_decimal_from_str<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s.is_empty() {
        return Ok(Decimal::ZERO);
    }
    s.parse::<Decimal>().map_err(serde::de::Error::custom)
}

//! Order types and status enums.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Convert to the exchange's string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order accepted and resting on the book.
    #[serde(alias = "live", alias = "init")]
    New,
    /// Order partially filled.
    PartiallyFilled,
    /// Order completely filled.
    Filled,
    /// Order canceled.
    #[serde(alias = "cancelled")]
    Canceled,
    /// Any status this crate does not model.
    #[serde(other)]
    Unknown,
}

/// A limit order to submit.
///
/// Price and size are expected to be rounded to the instrument's precision
/// already; the gateway sends them as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitOrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
}

impl LimitOrderRequest {
    pub fn buy(symbol: impl Into<String>, price: Decimal, size: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::Buy,
            price,
            size,
        }
    }

    pub fn sell(symbol: impl Into<String>, price: Decimal, size: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::Sell,
            price,
            size,
        }
    }
}

/// An order currently resting on the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub price: Decimal,
    pub size: Decimal,
}

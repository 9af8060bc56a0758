//! Open position as reported by the exchange.

use rust_decimal::Decimal;

/// An open futures position in a single symbol.
///
/// This is the exchange's view, not a locally derived one: sell sizing reads
/// it so that partial fills and orders placed outside the bot are accounted
/// for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Trading pair symbol.
    pub symbol: String,
    /// Position direction ("long" / "short").
    pub hold_side: String,
    /// Average entry price.
    pub open_price_avg: Decimal,
    /// Total position size.
    pub total: Decimal,
    /// Size not locked by closing orders.
    pub available: Decimal,
}

impl Position {
    /// Check if there is nothing to sell.
    pub fn is_flat(&self) -> bool {
        self.total <= Decimal::ZERO
    }
}

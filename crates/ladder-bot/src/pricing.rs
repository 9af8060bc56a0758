//! Ladder price and size arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

/// `current` lowered by `percent` percent.
pub fn price_below(current: Decimal, percent: Decimal) -> Decimal {
    current * (Decimal::ONE - percent / Decimal::ONE_HUNDRED)
}

/// `entry` raised by `percent` percent.
pub fn price_above(entry: Decimal, percent: Decimal) -> Decimal {
    entry * (Decimal::ONE + percent / Decimal::ONE_HUNDRED)
}

/// Round a price to the instrument's precision, half away from zero.
pub fn round_price(price: Decimal, precision: u32) -> Decimal {
    price.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// Instrument units bought by `amount` of quote currency at `price`.
///
/// Truncated to `precision` so the order never exceeds the amount. `None`
/// when the price is not positive or the result rounds to zero.
pub fn order_size(amount: Decimal, price: Decimal, precision: u32) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return None;
    }
    let size = (amount / price).round_dp_with_strategy(precision, RoundingStrategy::ToZero);
    (size > Decimal::ZERO).then_some(size)
}

//! Ladder trading for Bitget USDT futures.
//!
//! For every configured symbol the bot places a ladder of limit buy orders.
//! When a buy fills it reads the resulting position from the exchange and
//! places one limit sell a fixed percentage above the average entry,
//! replacing any earlier sell. When the sell fills the symbol either stops
//! or starts a fresh ladder, depending on its policy.
//!
//! ```text
//! StreamingSession ──payload──> Bot ──OrderUpdate──> TradingOrchestrator (per symbol)
//!                                                          │
//!                                                          v
//!                                                    OrderGateway (REST)
//! ```

mod bot;
mod config;
mod error;
mod orchestrator;
mod pricing;

#[cfg(test)]
mod test_support;

pub use bot::Bot;
pub use config::{
    BotConfig, BuyOrderConfig, PositionSettleConfig, PriceRule, SellFillPolicy, SessionSettings,
    TradingProcessConfig,
};
pub use error::{BotError, ConfigError};
pub use orchestrator::{
    BuyLevel, LadderSettings, LadderSnapshot, SellOrder, TradingOrchestrator, UpdateOutcome,
};
pub use pricing::{order_size, price_above, price_below, round_price};

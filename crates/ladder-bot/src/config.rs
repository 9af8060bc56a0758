//! Configuration file model.
//!
//! The file is JSON. Every trading process names its symbol, the buy ladder,
//! the sell target and what happens once the sell order fills:
//!
//! ```json
//! {
//!   "mode": "demo",
//!   "trading_processes": [{
//!     "symbol": "SBTCSUSDT",
//!     "sell_target_percent": 0.8,
//!     "on_sell_fill": { "policy": "terminate" },
//!     "buy_orders": [
//!       { "coin_price": 40000, "order_amount": 100 },
//!       { "coin_price_below_percent": 0.5, "order_amount": 100 }
//!     ]
//!   }]
//! }
//! ```

use crate::error::ConfigError;
use common::TradingMode;
use connector_core::SessionConfig;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Live or demo namespace.
    pub mode: TradingMode,
    /// One entry per traded symbol.
    pub trading_processes: Vec<TradingProcessConfig>,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub position_settle: PositionSettleConfig,
}

/// One traded symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingProcessConfig {
    pub symbol: String,
    /// Sell this far above the average entry price, in percent.
    pub sell_target_percent: Decimal,
    /// Decimal places for order prices.
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
    /// Decimal places for order sizes.
    #[serde(default = "default_size_precision")]
    pub size_precision: u32,
    /// Required: there is no implicit choice between the two policies.
    pub on_sell_fill: SellFillPolicy,
    pub buy_orders: Vec<BuyOrderConfig>,
}

/// What an orchestrator does once its sell order fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SellFillPolicy {
    /// The symbol is done; its orchestrator is removed.
    Terminate,
    /// Place a fresh ladder, up to `max_cycles` completed cycles in total.
    RestartLadder { max_cycles: u32 },
}

/// One rung of the buy ladder.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyOrderConfig {
    /// Absolute limit price.
    #[serde(default)]
    pub coin_price: Option<Decimal>,
    /// Percent below the market price at the time the ladder is placed.
    #[serde(default)]
    pub coin_price_below_percent: Option<Decimal>,
    /// Quote-currency amount to spend.
    pub order_amount: Decimal,
}

/// How a buy level's price is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRule {
    Fixed(Decimal),
    BelowMarket { percent: Decimal },
}

impl BuyOrderConfig {
    /// The price source, if exactly one is configured.
    pub fn price_rule(&self) -> Result<PriceRule, ConfigError> {
        match (self.coin_price, self.coin_price_below_percent) {
            (Some(price), None) => Ok(PriceRule::Fixed(price)),
            (None, Some(percent)) => Ok(PriceRule::BelowMarket { percent }),
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "buy order sets both coin_price and coin_price_below_percent".into(),
            )),
            (None, None) => Err(ConfigError::Invalid(
                "buy order needs coin_price or coin_price_below_percent".into(),
            )),
        }
    }
}

/// Streaming session timing, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub heartbeat_interval_secs: u64,
    pub idle_timeout_secs: u64,
    pub pong_timeout_secs: u64,
    pub reconnect_delay_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 15,
            idle_timeout_secs: 50,
            pong_timeout_secs: 10,
            reconnect_delay_secs: 5,
        }
    }
}

impl SessionSettings {
    /// Build the session configuration for an endpoint.
    pub fn to_session_config(&self, url: &str) -> SessionConfig {
        SessionConfig::new(url)
            .with_heartbeat_interval(Duration::from_secs(self.heartbeat_interval_secs))
            .with_idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .with_pong_timeout(Duration::from_secs(self.pong_timeout_secs))
            .with_reconnect_delay(Duration::from_secs(self.reconnect_delay_secs))
    }
}

/// How long to wait for the position to reflect a buy fill.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PositionSettleConfig {
    pub initial_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PositionSettleConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 3_000,
            poll_interval_ms: 1_000,
            max_attempts: 5,
        }
    }
}

impl PositionSettleConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_price_precision() -> u32 {
    1
}

fn default_size_precision() -> u32 {
    4
}

impl BotConfig {
    /// Read, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate configuration text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and consistency.
    ///
    /// Symbol prefixes are not checked against the mode here; the gateway
    /// rejects mismatches when an order is placed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trading_processes.is_empty() {
            return Err(ConfigError::Invalid("no trading processes configured".into()));
        }

        let mut seen = HashSet::new();
        for process in &self.trading_processes {
            process.validate()?;
            if !seen.insert(process.symbol.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "symbol {} configured more than once",
                    process.symbol
                )));
            }
        }

        let session = &self.session;
        if session.heartbeat_interval_secs == 0 || session.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid("session intervals must be positive".into()));
        }
        if session.heartbeat_interval_secs >= session.idle_timeout_secs {
            return Err(ConfigError::Invalid(
                "heartbeat_interval_secs must be shorter than idle_timeout_secs".into(),
            ));
        }
        if self.position_settle.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "position_settle.max_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

impl TradingProcessConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| ConfigError::Invalid(format!("{}: {}", self.symbol, msg));

        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("empty symbol".into()));
        }
        if self.sell_target_percent <= Decimal::ZERO {
            return Err(invalid("sell_target_percent must be positive"));
        }
        if self.buy_orders.is_empty() {
            return Err(invalid("no buy orders"));
        }
        if let SellFillPolicy::RestartLadder { max_cycles: 0 } = self.on_sell_fill {
            return Err(invalid("max_cycles must be at least 1"));
        }

        for order in &self.buy_orders {
            if order.order_amount <= Decimal::ZERO {
                return Err(invalid("order_amount must be positive"));
            }
            match order.price_rule().map_err(|e| invalid(&e.to_string()))? {
                PriceRule::Fixed(price) if price <= Decimal::ZERO => {
                    return Err(invalid("coin_price must be positive"));
                }
                PriceRule::BelowMarket { percent }
                    if percent <= Decimal::ZERO || percent >= Decimal::ONE_HUNDRED =>
                {
                    return Err(invalid("coin_price_below_percent must be between 0 and 100"));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

//! Trading mode (live or demo) and the exchange namespaces it selects.
//!
//! Bitget runs demo ("paper") futures trading on the same hosts as live
//! trading but in a parallel namespace: demo instruments carry an `S` prefix
//! (`SBTCSUSDT`), settle in `SUSDT` and are addressed through the
//! `susdt-futures` product type.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

const REST_BASE_URL: &str = "https://api.bitget.com";
const WS_PRIVATE_URL: &str = "wss://ws.bitget.com/v2/ws/private";

/// Demo instruments are `S` + base coin + `SUSDT`.
const DEMO_SYMBOL_PREFIX: char = 'S';
const DEMO_SYMBOL_SUFFIX: &str = "SUSDT";

/// Live or demo trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    /// Real funds.
    #[default]
    Live,
    /// Exchange-provided paper trading.
    #[serde(alias = "paper")]
    Demo,
}

impl TradingMode {
    /// REST API base URL.
    pub fn rest_base_url(&self) -> &'static str {
        REST_BASE_URL
    }

    /// Private WebSocket URL (login required).
    pub fn ws_private_url(&self) -> &'static str {
        WS_PRIVATE_URL
    }

    /// `productType` parameter for REST calls.
    pub fn product_type(&self) -> &'static str {
        match self {
            Self::Live => "usdt-futures",
            Self::Demo => "susdt-futures",
        }
    }

    /// `marginCoin` parameter for REST calls.
    pub fn margin_coin(&self) -> &'static str {
        match self {
            Self::Live => "USDT",
            Self::Demo => "SUSDT",
        }
    }

    /// `instType` used when subscribing to WebSocket channels.
    pub fn inst_type(&self) -> &'static str {
        match self {
            Self::Live => "USDT-FUTURES",
            Self::Demo => "SUSDT-FUTURES",
        }
    }

    /// Check that a symbol follows this mode's naming convention.
    ///
    /// Demo symbols look like `SBTCSUSDT`. Live symbols may start with `S`
    /// (`SOLUSDT`) but must not carry the demo settlement suffix.
    pub fn validate_symbol(&self, symbol: &str) -> Result<(), String> {
        match (self, is_demo_symbol(symbol)) {
            (Self::Demo, false) => Err(format!(
                "demo trading requires '{}<COIN>{}' symbols, got: {}",
                DEMO_SYMBOL_PREFIX, DEMO_SYMBOL_SUFFIX, symbol
            )),
            (Self::Live, true) => Err(format!(
                "live trading does not accept demo symbols, got: {}",
                symbol
            )),
            _ => Ok(()),
        }
    }

    /// Load the mode from `BITGET_TRADING_MODE`.
    ///
    /// Returns `None` if not set or invalid.
    pub fn from_env() -> Option<Self> {
        std::env::var("BITGET_TRADING_MODE")
            .ok()
            .and_then(|s| s.parse().ok())
    }
}

fn is_demo_symbol(symbol: &str) -> bool {
    symbol.len() > DEMO_SYMBOL_SUFFIX.len() + 1
        && symbol.starts_with(DEMO_SYMBOL_PREFIX)
        && symbol.ends_with(DEMO_SYMBOL_SUFFIX)
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Demo => write!(f, "demo"),
        }
    }
}

impl FromStr for TradingMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" | "production" | "prod" => Ok(Self::Live),
            "demo" | "paper" | "sandbox" => Ok(Self::Demo),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Error parsing a trading mode string.
#[derive(Debug, Clone)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid trading mode '{}', expected 'live' or 'demo'",
            self.0
        )
    }
}

impl std::error::Error for ParseModeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_namespace() {
        let mode = TradingMode::Live;
        assert_eq!(mode.product_type(), "usdt-futures");
        assert_eq!(mode.margin_coin(), "USDT");
        assert_eq!(mode.inst_type(), "USDT-FUTURES");
    }

    #[test]
    fn test_demo_namespace() {
        let mode = TradingMode::Demo;
        assert_eq!(mode.product_type(), "susdt-futures");
        assert_eq!(mode.margin_coin(), "SUSDT");
        assert_eq!(mode.inst_type(), "SUSDT-FUTURES");
    }

    #[test]
    fn test_validate_symbol_demo() {
        assert!(TradingMode::Demo.validate_symbol("SBTCSUSDT").is_ok());
        assert!(TradingMode::Demo.validate_symbol("SETHSUSDT").is_ok());
        assert!(TradingMode::Demo.validate_symbol("BTCUSDT").is_err());
        assert!(TradingMode::Demo.validate_symbol("SOLUSDT").is_err());
        assert!(TradingMode::Demo.validate_symbol("SUSDT").is_err());
    }

    #[test]
    fn test_validate_symbol_live() {
        assert!(TradingMode::Live.validate_symbol("BTCUSDT").is_ok());
        assert!(TradingMode::Live.validate_symbol("SBTCSUSDT").is_err());
    }

    #[test]
    fn test_live_symbols_starting_with_s() {
        for symbol in ["SOLUSDT", "SUIUSDT", "SANDUSDT", "SHIBUSDT"] {
            assert!(TradingMode::Live.validate_symbol(symbol).is_ok(), "{}", symbol);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("LIVE".parse::<TradingMode>().unwrap(), TradingMode::Live);
        assert_eq!("prod".parse::<TradingMode>().unwrap(), TradingMode::Live);
        assert_eq!("demo".parse::<TradingMode>().unwrap(), TradingMode::Demo);
        assert_eq!("Paper".parse::<TradingMode>().unwrap(), TradingMode::Demo);
        assert!("testnet-ish".parse::<TradingMode>().is_err());
    }

    #[test]
    fn test_deserialize() {
        let mode: TradingMode = serde_json::from_str(r#""demo""#).unwrap();
        assert_eq!(mode, TradingMode::Demo);
        let mode: TradingMode = serde_json::from_str(r#""paper""#).unwrap();
        assert_eq!(mode, TradingMode::Demo);
        let mode: TradingMode = serde_json::from_str(r#""live""#).unwrap();
        assert_eq!(mode, TradingMode::Live);
    }

    #[test]
    fn test_display() {
        assert_eq!(TradingMode::Live.to_string(), "live");
        assert_eq!(TradingMode::Demo.to_string(), "demo");
    }
}

//! Generic REST client infrastructure.
//!
//! This crate provides a thin wrapper around `reqwest` with:
//!
//! - Consistent error handling via `RestError`
//! - GET with a query string and POST with a JSON body
//! - Header injection for authentication
//! - A hard per-request timeout so exchange calls fail instead of hanging
//! - Rate limit detection
//!
//! # Example
//!
//! ```rust,ignore
//! use rest_client::RestClient;
//!
//! let client = RestClient::new("https://api.bitget.com", Duration::from_secs(10))?;
//! let ticker: TickerResponse = client
//!     .get("/api/v2/mix/market/ticker", Some("symbol=BTCUSDT&productType=usdt-futures"), None)
//!     .await?;
//! ```

mod client;
mod error;

pub use client::RestClient;
pub use error::RestError;

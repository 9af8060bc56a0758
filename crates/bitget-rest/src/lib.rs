//! Bitget futures REST API client.
//!
//! This crate provides a typed client for the Bitget v2 mix (futures) API:
//!
//! - **Request signing**: every call carries `ACCESS-*` headers signed with
//!   HMAC-SHA256 over `timestamp + method + path + body`
//! - **Mode awareness**: product type and margin coin follow the configured
//!   `TradingMode`, and symbols are checked against it before any request
//! - **Response envelope**: `{code, msg, data}` is unwrapped, non-`00000`
//!   codes become typed errors
//! - **Gateway**: `BitgetRestClient` implements `execution_core::OrderGateway`
//!
//! # Example
//!
//! ```rust,ignore
//! use auth::ApiCredentials;
//! use bitget_rest::BitgetRestClient;
//! use common::TradingMode;
//! use execution_core::{LimitOrderRequest, OrderGateway};
//!
//! let credentials = ApiCredentials::from_env()?;
//! let client = BitgetRestClient::new(credentials, TradingMode::Demo)?;
//!
//! let price = client.current_price("SBTCSUSDT").await?;
//! let order_id = client
//!     .place_limit_order(&LimitOrderRequest::buy("SBTCSUSDT", price, dec!(0.001)))
//!     .await?;
//! ```

mod client;
mod error;
mod requests;
mod responses;

pub use client::BitgetRestClient;
pub use error::BitgetRestError;
pub use responses::{ApiResponse, SUCCESS_CODE};

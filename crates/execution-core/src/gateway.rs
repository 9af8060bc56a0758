//! The command side of the exchange, as seen by the trading layer.

use crate::order::{LimitOrderRequest, OpenOrder};
use crate::position::Position;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by an `OrderGateway`.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The exchange declined the command.
    #[error("rejected: {reason}")]
    Rejected {
        /// Exchange-provided reason.
        reason: String,
    },

    /// The query matched no data.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request did not complete (network failure, timeout, bad response).
    #[error("transport error: {0}")]
    Transport(String),

    /// The symbol does not follow the active trading mode's naming convention.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
}

/// Synchronous request/response operations against the exchange.
///
/// One call is one round trip. Implementations must not retry commands on
/// their own: a silently repeated `place_limit_order` could double an order.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Last traded price for a symbol.
    async fn current_price(&self, symbol: &str) -> Result<Decimal, GatewayError>;

    /// Open position for a symbol, `None` if there is none.
    async fn position(&self, symbol: &str) -> Result<Option<Position>, GatewayError>;

    /// Place a good-till-canceled limit order and return its exchange ID.
    async fn place_limit_order(&self, request: &LimitOrderRequest) -> Result<String, GatewayError>;

    /// Cancel an order by exchange ID.
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<(), GatewayError>;

    /// Orders currently resting on the book for a symbol.
    async fn pending_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError>;
}

/// Shared handle to a gateway.
pub type SharedGateway = Arc<dyn OrderGateway>;

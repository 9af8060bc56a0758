//! Core execution types for the ladder bot.
//!
//! This crate provides the vocabulary shared by the exchange adapters and
//! the trading layer:
//!
//! - **Order types**: `OrderSide`, `OrderStatus`, `LimitOrderRequest`, `OpenOrder`
//! - **Order updates**: `OrderUpdate` records streamed by the exchange, and
//!   `decode_order_batch` to turn a streamed payload into them
//! - **Positions**: `Position` as reported by the exchange
//! - **Gateway**: the `OrderGateway` trait the trading layer issues commands
//!   through, and its `GatewayError` taxonomy
//!
//! # Order Lifecycle
//!
//! 1. A limit order is placed through `OrderGateway::place_limit_order`
//! 2. The exchange returns its order identifier synchronously
//! 3. Status changes arrive later as `OrderUpdate` records on the stream
//! 4. The order reaches a terminal state (filled or canceled)

mod gateway;
mod order;
mod order_update;
mod position;

pub use gateway::{GatewayError, OrderGateway, SharedGateway};
pub use order::{LimitOrderRequest, OpenOrder, OrderSide, OrderStatus};
pub use order_update::{decode_order_batch, OrderUpdate};
pub use position::Position;

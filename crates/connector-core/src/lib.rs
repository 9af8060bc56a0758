//! Shared types for streaming exchange connectors.

mod config;
mod error;
mod state;

pub use config::SessionConfig;
pub use error::ConnectorError;
pub use state::SessionState;

use std::sync::Arc;

/// Consumer of forwarded payloads.
///
/// Each call receives the raw bytes of one data frame (a batch of order
/// updates); decoding is left to the consumer.
pub type PayloadHandler = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

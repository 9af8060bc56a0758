//! Bitget private WebSocket connector.
//!
//! `StreamingSession` keeps one authenticated connection subscribed to the
//! `orders` channel and hands each data push to a single registered handler:
//!
//! - **Login**: signed `op=login` handshake, acknowledged before subscribing
//! - **Heartbeat**: text `ping` on a fixed interval, `pong` expected back
//! - **Liveness**: the server drops idle connections without a close frame,
//!   so silence beyond the idle threshold forces a reconnect
//! - **Reconnect**: fixed delay, retried until connected, logged in and
//!   subscribed again
//! - **Inline recovery**: "not logged in" triggers a re-login and "request too
//!   many" a re-subscribe, both on the live connection

mod frame;
mod session;

pub use frame::{classify_frame, login_frame, subscribe_frame, InboundFrame, PING, PONG};
pub use session::StreamingSession;

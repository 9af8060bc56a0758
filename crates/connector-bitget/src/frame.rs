//! Outbound frame builders and the inbound frame classifier.

use auth::{ApiCredentials, RequestSigner};
use connector_core::ConnectorError;
use serde::Deserialize;
use serde_json::{json, Value};

/// Heartbeat request.
pub const PING: &str = "ping";
/// Heartbeat reply.
pub const PONG: &str = "pong";

const ORDERS_CHANNEL: &str = "orders";
/// Subscribes to every instrument of the product type.
const ALL_INSTRUMENTS: &str = "default";

const CODE_NOT_LOGGED_IN: i64 = 30004;
const CODE_TOO_MANY_REQUESTS: i64 = 30006;

/// What an inbound frame means to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Heartbeat reply.
    Pong,
    /// Login accepted.
    LoginAck,
    /// Login answered with a non-zero code.
    LoginRejected { code: i64, message: String },
    /// Subscription confirmed.
    Subscribed { inst_type: String, channel: String },
    /// The server forgot the login; log in again on the same connection.
    NotLoggedIn,
    /// The server throttled a request; subscribe again.
    TooManyRequests,
    /// Any other error event.
    ServerError { code: i64, message: String },
    /// A push carrying a `data` payload, serialized back to bytes.
    Data(Vec<u8>),
    /// Recognized but irrelevant (unsubscribe acks, pushes without data).
    Ignored,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    arg: Option<RawArg>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArg {
    #[serde(default)]
    inst_type: String,
    #[serde(default)]
    channel: String,
}

/// Classify one text frame.
///
/// Returns `ConnectorError::Protocol` for text that is neither a heartbeat
/// reply nor a JSON object.
pub fn classify_frame(text: &str) -> Result<InboundFrame, ConnectorError> {
    if text == PONG {
        return Ok(InboundFrame::Pong);
    }

    let frame: RawFrame =
        serde_json::from_str(text).map_err(|e| ConnectorError::Protocol(e.to_string()))?;
    let code = frame.code.as_ref().and_then(code_as_i64).unwrap_or(0);
    let message = frame.msg.unwrap_or_default();

    let classified = match frame.event.as_deref() {
        Some("login") if code == 0 => InboundFrame::LoginAck,
        Some("login") => InboundFrame::LoginRejected { code, message },
        Some("subscribe") => {
            let arg = frame.arg.unwrap_or_default();
            InboundFrame::Subscribed {
                inst_type: arg.inst_type,
                channel: arg.channel,
            }
        }
        Some("error") => match code {
            CODE_NOT_LOGGED_IN => InboundFrame::NotLoggedIn,
            CODE_TOO_MANY_REQUESTS => InboundFrame::TooManyRequests,
            _ => InboundFrame::ServerError { code, message },
        },
        Some(_) => InboundFrame::Ignored,
        None => match frame.data {
            Some(data) => InboundFrame::Data(
                serde_json::to_vec(&data).map_err(|e| ConnectorError::Protocol(e.to_string()))?,
            ),
            None => InboundFrame::Ignored,
        },
    };

    Ok(classified)
}

/// Codes arrive as numbers on some events and as strings on others.
fn code_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Build the login request for a Unix timestamp in seconds.
pub fn login_frame(credentials: &ApiCredentials, timestamp_secs: &str) -> String {
    let sign = RequestSigner::new(credentials).sign_login(timestamp_secs);

    json!({
        "op": "login",
        "args": [{
            "apiKey": credentials.api_key(),
            "passphrase": credentials.expose_passphrase(),
            "timestamp": timestamp_secs,
            "sign": sign,
        }]
    })
    .to_string()
}

/// Build the `orders` subscription for an instrument type.
pub fn subscribe_frame(inst_type: &str) -> String {
    json!({
        "op": "subscribe",
        "args": [{
            "instType": inst_type,
            "channel": ORDERS_CHANNEL,
            "instId": ALL_INSTRUMENTS,
        }]
    })
    .to_string()
}

//! Bitget REST API error types.

use execution_core::GatewayError;
use rest_client::RestError;
use thiserror::Error;

/// Errors that can occur when interacting with the Bitget REST API.
#[derive(Debug, Error)]
pub enum BitgetRestError {
    /// REST client error (network, timeout, etc.).
    #[error("REST client error: {0}")]
    Rest(#[from] RestError),

    /// Bitget API error (non-success code in the response envelope).
    #[error("Bitget API error {code}: {message}")]
    ApiError {
        /// Bitget error code, e.g. "40762".
        code: String,
        /// Error message.
        message: String,
    },

    /// The order does not exist (or is no longer open).
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Cancel was acknowledged for a different order than requested.
    #[error("Cancel acknowledged order {actual}, expected {expected}")]
    OrderIdMismatch {
        /// Order ID that was sent.
        expected: String,
        /// Order ID the exchange reported.
        actual: String,
    },

    /// The symbol does not match the trading mode.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// No data for the request.
    #[error("No data: {0}")]
    NoData(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl BitgetRestError {
    /// Parse a Bitget error body.
    ///
    /// Bitget returns errors in the format: `{"code": "40034", "msg": "...", "data": null}`
    pub fn from_api_response(body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ApiError {
            code: String,
            msg: String,
        }

        match serde_json::from_str::<ApiError>(body) {
            Ok(err) => Self::classify_api_error(err.code, err.msg),
            Err(_) => Self::Parse(format!("Failed to parse error response: {}", body)),
        }
    }

    /// Classify a Bitget API error code into a more specific error.
    pub(crate) fn classify_api_error(code: String, message: String) -> Self {
        match code.as_str() {
            "40768" | "43001" => Self::OrderNotFound(message),
            _ => Self::ApiError { code, message },
        }
    }

    /// Lift an HTTP-level failure into an API error when the body carries one.
    pub(crate) fn from_rest(err: RestError) -> Self {
        match err {
            RestError::HttpError { status, message } => match Self::from_api_response(&message) {
                Self::Parse(_) => Self::Rest(RestError::HttpError { status, message }),
                api_err => api_err,
            },
            other => Self::Rest(other),
        }
    }
}

impl From<BitgetRestError> for GatewayError {
    fn from(err: BitgetRestError) -> Self {
        match err {
            BitgetRestError::ApiError { code, message } => GatewayError::Rejected {
                reason: format!("{}: {}", code, message),
            },
            BitgetRestError::OrderIdMismatch { .. } => GatewayError::Rejected {
                reason: err.to_string(),
            },
            BitgetRestError::OrderNotFound(msg) | BitgetRestError::NoData(msg) => {
                GatewayError::NotFound(msg)
            }
            BitgetRestError::InvalidSymbol(msg) => GatewayError::InvalidSymbol(msg),
            BitgetRestError::Rest(_) | BitgetRestError::Parse(_) => {
                GatewayError::Transport(err.to_string())
            }
        }
    }
}

//! REST client error types.

use thiserror::Error;

/// Failure of one REST call.
#[derive(Debug, Error)]
pub enum RestError {
    /// Non-success HTTP status; `message` holds the response body.
    #[error("HTTP {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    /// Response body was not the expected JSON.
    #[error("invalid response body: {0}")]
    Parse(String),

    /// HTTP 429.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("cannot build request: {0}")]
    RequestBuild(String),
}

impl RestError {
    /// The request never got an answer from the server.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RestError::Timeout | RestError::Connection(_) | RestError::RequestBuild(_)
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RestError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            _ if err.is_timeout() => RestError::Timeout,
            _ if err.is_decode() => RestError::Parse(err.to_string()),
            _ if err.is_builder() => RestError::RequestBuild(err.to_string()),
            Some(status) => RestError::HttpError {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => RestError::Connection(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(RestError::Timeout.is_transport());
        assert!(RestError::Connection("reset".into()).is_transport());
        assert!(!RestError::Parse("bad".into()).is_transport());
        assert!(RestError::RateLimited { retry_after_ms: 1 }.is_rate_limited());
        assert!(!RestError::HttpError {
            status: 400,
            message: String::new()
        }
        .is_rate_limited());
    }

    #[test]
    fn test_display() {
        let err = RestError::HttpError {
            status: 400,
            message: r#"{"code":"40762"}"#.into(),
        };
        assert_eq!(err.to_string(), r#"HTTP 400: {"code":"40762"}"#);
    }
}

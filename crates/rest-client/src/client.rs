//! Thin `reqwest` wrapper shared by exchange clients.

use crate::error::RestError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Used when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_MS: u64 = 1_000;

/// HTTP client bound to one base URL.
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// Build a client for `base_url` (e.g. "https://api.bitget.com") with a
    /// per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestError::RequestBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path?query` and decode the JSON answer.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&str>,
        headers: Option<&[(&str, &str)]>,
    ) -> Result<T, RestError> {
        self.send(Method::GET, path, query, None, headers).await
    }

    /// POST a pre-serialized JSON body. Signed endpoints sign the exact
    /// bytes, so the caller serializes.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &str,
        headers: Option<&[(&str, &str)]>,
    ) -> Result<T, RestError> {
        self.send(Method::POST, path, None, Some(body), headers).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        body: Option<&str>,
        headers: Option<&[(&str, &str)]>,
    ) -> Result<T, RestError> {
        let url = self.build_url(path, query);
        tracing::debug!(method = %method, url = %url, body = body.unwrap_or(""), "REST request");

        let mut request = self.client.request(method, &url);
        request = apply_headers(request, headers.unwrap_or_default());
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        decode(request.send().await?).await
    }

    fn build_url(&self, path: &str, query: Option<&str>) -> String {
        match query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}{}?{}", self.base_url, path, q),
            None => format!("{}{}", self.base_url, path),
        }
    }
}

fn apply_headers(request: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    headers
        .iter()
        .fold(request, |request, (name, value)| request.header(*name, *value))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RestError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(RestError::RateLimited {
            retry_after_ms: retry_after_ms(&response),
        });
    }

    let body = response.text().await?;
    if !status.is_success() {
        return Err(RestError::HttpError {
            status: status.as_u16(),
            message: body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(body = %body, error = %e, "Failed to parse response");
        RestError::Parse(e.to_string())
    })
}

/// `Retry-After` in milliseconds; only the delta-seconds form is read.
fn retry_after_ms(response: &Response) -> u64 {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER_MS, |secs| secs * 1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> RestClient {
        RestClient::new(base_url, Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_build_url() {
        let client = client("https://api.bitget.com");
        assert_eq!(
            client.build_url("/api/v2/mix/market/ticker", None),
            "https://api.bitget.com/api/v2/mix/market/ticker"
        );
        assert_eq!(
            client.build_url(
                "/api/v2/mix/market/ticker",
                Some("productType=usdt-futures&symbol=BTCUSDT")
            ),
            "https://api.bitget.com/api/v2/mix/market/ticker?productType=usdt-futures&symbol=BTCUSDT"
        );
    }

    #[test]
    fn test_empty_query_and_trailing_slash() {
        let client = client("https://api.bitget.com/");
        assert_eq!(client.base_url(), "https://api.bitget.com");
        assert_eq!(
            client.build_url("/api/v2/public/time", Some("")),
            "https://api.bitget.com/api/v2/public/time"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = RestClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let result: Result<serde_json::Value, _> = client.get("/", None, None).await;
        assert!(result.unwrap_err().is_transport());
    }
}

//! Bitget REST API client.

use crate::error::BitgetRestError;
use crate::requests::{CancelOrderBody, PlaceOrderBody};
use crate::responses::{ApiResponse, OrderAck, PendingOrdersData, PositionRaw, TickerRaw};
use async_trait::async_trait;
use auth::{ApiCredentials, RequestSigner};
use common::TradingMode;
use execution_core::{GatewayError, LimitOrderRequest, OpenOrder, OrderGateway, Position};
use rest_client::RestClient;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Request timeout for Bitget API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const TICKER_PATH: &str = "/api/v2/mix/market/ticker";
const SINGLE_POSITION_PATH: &str = "/api/v2/mix/position/single-position";
const PENDING_ORDERS_PATH: &str = "/api/v2/mix/order/orders-pending";
const PLACE_ORDER_PATH: &str = "/api/v2/mix/order/place-order";
const CANCEL_ORDER_PATH: &str = "/api/v2/mix/order/cancel-order";

/// Bitget REST API client with authentication support.
pub struct BitgetRestClient {
    client: RestClient,
    credentials: ApiCredentials,
    mode: TradingMode,
}

impl BitgetRestClient {
    /// Create a new Bitget REST client for the given trading mode.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credentials: ApiCredentials, mode: TradingMode) -> Result<Self, BitgetRestError> {
        Self::with_base_url(credentials, mode, mode.rest_base_url())
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(
        credentials: ApiCredentials,
        mode: TradingMode,
        base_url: &str,
    ) -> Result<Self, BitgetRestError> {
        let client = RestClient::new(base_url, REQUEST_TIMEOUT)?;

        Ok(Self {
            client,
            credentials,
            mode,
        })
    }

    /// Get the trading mode this client is bound to.
    pub fn mode(&self) -> TradingMode {
        self.mode
    }

    /// Get the API key (for logging/debugging).
    pub fn api_key(&self) -> &str {
        self.credentials.api_key()
    }

    fn check_symbol(&self, symbol: &str) -> Result<(), BitgetRestError> {
        self.mode
            .validate_symbol(symbol)
            .map_err(BitgetRestError::InvalidSymbol)
    }

    /// Build the signed header set for one request.
    ///
    /// `request_path` includes the `?query` part for GET requests.
    fn signed_headers(
        &self,
        timestamp: &str,
        method: &str,
        request_path: &str,
        body: &str,
    ) -> Vec<(&'static str, String)> {
        let sign = RequestSigner::new(&self.credentials).sign_request(
            timestamp,
            method,
            request_path,
            body,
        );

        vec![
            ("ACCESS-KEY", self.credentials.api_key().to_string()),
            ("ACCESS-SIGN", sign),
            ("ACCESS-TIMESTAMP", timestamp.to_string()),
            ("ACCESS-PASSPHRASE", self.credentials.expose_passphrase().to_string()),
            ("Content-Type", "application/json".to_string()),
            ("locale", "en-US".to_string()),
        ]
    }

    async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<T, BitgetRestError> {
        let timestamp = timestamp_ms();
        let request_path = format!("{}?{}", path, query);
        let headers = self.signed_headers(&timestamp, "GET", &request_path, "");
        let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response: ApiResponse<T> = self
            .client
            .get(path, Some(query), Some(&header_refs))
            .await
            .map_err(BitgetRestError::from_rest)?;

        response.into_data()
    }

    async fn post_signed<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BitgetRestError> {
        let body = serde_json::to_string(body).map_err(|e| BitgetRestError::Parse(e.to_string()))?;
        let timestamp = timestamp_ms();
        let headers = self.signed_headers(&timestamp, "POST", path, &body);
        let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response: ApiResponse<T> = self
            .client
            .post(path, &body, Some(&header_refs))
            .await
            .map_err(BitgetRestError::from_rest)?;

        response.into_data()
    }

    // ========================================================================
    // Market Data
    // ========================================================================

    /// Get the last traded price.
    ///
    /// GET /api/v2/mix/market/ticker
    pub async fn get_ticker_price(&self, symbol: &str) -> Result<Decimal, BitgetRestError> {
        self.check_symbol(symbol)?;
        let query = format!("productType={}&symbol={}", self.mode.product_type(), symbol);

        let tickers: Vec<TickerRaw> = self.get_signed(TICKER_PATH, &query).await?;
        let ticker = tickers
            .into_iter()
            .next()
            .ok_or_else(|| BitgetRestError::NoData(format!("no ticker for {}", symbol)))?;

        tracing::debug!(symbol = %ticker.symbol, price = %ticker.last_price, "Ticker fetched");
        Ok(ticker.last_price)
    }

    // ========================================================================
    // Positions
    // ========================================================================

    /// Get the open position for a symbol.
    ///
    /// GET /api/v2/mix/position/single-position
    pub async fn get_position(&self, symbol: &str) -> Result<Option<Position>, BitgetRestError> {
        self.check_symbol(symbol)?;
        let query = format!(
            "symbol={}&productType={}&marginCoin={}",
            symbol,
            self.mode.product_type(),
            self.mode.margin_coin()
        );

        let positions: Vec<PositionRaw> = self.get_signed(SINGLE_POSITION_PATH, &query).await?;
        let position = positions.into_iter().next().map(Position::from);

        tracing::debug!(
            symbol = %symbol,
            total = ?position.as_ref().map(|p| p.total),
            open_price_avg = ?position.as_ref().map(|p| p.open_price_avg),
            "Position fetched"
        );

        Ok(position)
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// List orders resting on the book.
    ///
    /// GET /api/v2/mix/order/orders-pending
    pub async fn get_pending_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, BitgetRestError> {
        self.check_symbol(symbol)?;
        let query = format!("symbol={}&productType={}", symbol, self.mode.product_type());

        let data: PendingOrdersData = self.get_signed(PENDING_ORDERS_PATH, &query).await?;
        let orders: Vec<OpenOrder> = data
            .entrusted_list
            .unwrap_or_default()
            .into_iter()
            .map(OpenOrder::from)
            .collect();

        tracing::debug!(
            symbol = %symbol,
            count = orders.len(),
            end_id = ?data.end_id,
            "Pending orders fetched"
        );

        Ok(orders)
    }

    /// Place an isolated-margin GTC limit order.
    ///
    /// POST /api/v2/mix/order/place-order
    pub async fn place_order(&self, request: &LimitOrderRequest) -> Result<String, BitgetRestError> {
        self.check_symbol(&request.symbol)?;

        let body = PlaceOrderBody {
            symbol: &request.symbol,
            product_type: self.mode.product_type(),
            margin_mode: "isolated",
            margin_coin: self.mode.margin_coin(),
            size: request.size.to_string(),
            price: request.price.to_string(),
            side: request.side.as_str(),
            order_type: "limit",
            force: "gtc",
            reduce_only: "NO",
        };

        tracing::info!(
            symbol = %request.symbol,
            side = %request.side,
            price = %request.price,
            size = %request.size,
            "Placing order"
        );

        let ack: OrderAck = self.post_signed(PLACE_ORDER_PATH, &body).await?;

        tracing::info!(
            order_id = %ack.order_id,
            client_oid = ?ack.client_oid,
            "Order placed"
        );

        Ok(ack.order_id)
    }

    /// Cancel an order by exchange order ID.
    ///
    /// POST /api/v2/mix/order/cancel-order
    ///
    /// An acknowledgement naming a different order is treated as a failure.
    pub async fn cancel_order_by_id(
        &self,
        symbol: &str,
        order_id: &str,
    ) -> Result<(), BitgetRestError> {
        self.check_symbol(symbol)?;

        let body = CancelOrderBody {
            symbol,
            product_type: self.mode.product_type(),
            margin_coin: self.mode.margin_coin(),
            order_id,
        };

        tracing::info!(symbol = %symbol, order_id = %order_id, "Canceling order");

        let ack: OrderAck = self.post_signed(CANCEL_ORDER_PATH, &body).await?;
        if ack.order_id != order_id {
            return Err(BitgetRestError::OrderIdMismatch {
                expected: order_id.to_string(),
                actual: ack.order_id,
            });
        }

        tracing::info!(order_id = %order_id, "Order canceled");
        Ok(())
    }
}

#[async_trait]
impl OrderGateway for BitgetRestClient {
    async fn current_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        Ok(self.get_ticker_price(symbol).await?)
    }

    async fn position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        Ok(self.get_position(symbol).await?)
    }

    async fn place_limit_order(&self, request: &LimitOrderRequest) -> Result<String, GatewayError> {
        Ok(self.place_order(request).await?)
    }

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<(), GatewayError> {
        Ok(self.cancel_order_by_id(symbol, order_id).await?)
    }

    async fn pending_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        Ok(self.get_pending_orders(symbol).await?)
    }
}

impl std::fmt::Debug for BitgetRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitgetRestClient")
            .field("mode", &self.mode)
            .field("base_url", &self.client.base_url())
            .field("api_key", &self.credentials.api_key())
            .finish()
    }
}

/// Current Unix time in milliseconds, as sent in `ACCESS-TIMESTAMP`.
fn timestamp_ms() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn client(mode: TradingMode) -> BitgetRestClient {
        let credentials = ApiCredentials::new("key".into(), "secret".into(), "pass".into());
        BitgetRestClient::new(credentials, mode).unwrap()
    }

    #[test]
    fn test_signed_headers() {
        let client = client(TradingMode::Live);
        let headers = client.signed_headers(
            "1700000000000",
            "POST",
            PLACE_ORDER_PATH,
            r#"{"symbol":"BTCUSDT"}"#,
        );

        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(get("ACCESS-KEY"), "key");
        assert_eq!(get("ACCESS-TIMESTAMP"), "1700000000000");
        assert_eq!(get("ACCESS-PASSPHRASE"), "pass");
        assert_eq!(get("ACCESS-SIGN"), "C/vSpmkAdkJHFrpOiYGEkV5HK8LKTTJ44CrlBsnfknQ=");
        assert_eq!(get("Content-Type"), "application/json");
        assert_eq!(get("locale"), "en-US");
    }

    #[tokio::test]
    async fn test_symbol_checked_before_request() {
        let demo = client(TradingMode::Demo);
        let request = LimitOrderRequest::buy("BTCUSDT", dec!(39800), dec!(0.001));

        let err = demo.place_limit_order(&request).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSymbol(_)));

        let live = client(TradingMode::Live);
        let err = live.cancel_order("SBTCSUSDT", "1").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSymbol(_)));
    }

    #[test]
    fn test_timestamp_is_millis() {
        let ts = timestamp_ms();
        assert_eq!(ts.len(), 13);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", client(TradingMode::Demo));
        assert!(debug.contains("Demo"));
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("pass"));
    }
}

//! Request bodies for signed POST endpoints.

use serde::Serialize;

/// Body of POST /api/v2/mix/order/place-order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaceOrderBody<'a> {
    pub symbol: &'a str,
    pub product_type: &'a str,
    pub margin_mode: &'a str,
    pub margin_coin: &'a str,
    pub size: String,
    pub price: String,
    pub side: &'a str,
    pub order_type: &'a str,
    pub force: &'a str,
    pub reduce_only: &'a str,
}

/// Body of POST /api/v2/mix/order/cancel-order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CancelOrderBody<'a> {
    pub symbol: &'a str,
    pub product_type: &'a str,
    pub margin_coin: &'a str,
    pub order_id: &'a str,
}

//! Driving port for order reads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Error, Order, OrderId, ShopId};

/// Request to page through a shop's orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersRequest {
    /// Shop whose orders are listed.
    pub shop_id: ShopId,
    /// Page size; zero selects the configured default.
    #[serde(default)]
    pub limit: i64,
    /// Rows to skip.
    #[serde(default)]
    pub offset: i64,
}

/// Order reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderQuery: Send + Sync {
    /// Fetch an order with its lines.
    async fn get_order(&self, id: &OrderId) -> Result<Order, Error>;

    /// List a shop's orders, newest first.
    async fn list_orders(&self, request: ListOrdersRequest) -> Result<Vec<Order>, Error>;
}

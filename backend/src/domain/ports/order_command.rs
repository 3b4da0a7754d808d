//! Driving port for order creation and cancellation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{AddressId, CartId, CustomerRefs, Error, Order, OrderId, ShopId, VariantId};

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    /// Ordered variant.
    pub variant_id: VariantId,
    /// Raw quantity; must be positive.
    pub quantity: i64,
}

/// Request to create an order from explicit lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Shop the order is placed with.
    pub shop_id: ShopId,
    /// Owner references.
    #[serde(default)]
    pub customer: CustomerRefs,
    /// Delivery address.
    #[serde(default)]
    pub address_id: Option<AddressId>,
    /// Opt-in deduplication key.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Lines in the order they should be processed.
    pub lines: Vec<OrderLineRequest>,
}

/// Request to convert an active cart into an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderFromCartRequest {
    /// Source cart.
    pub cart_id: CartId,
    /// Owner references; fields left empty fall back to the cart's.
    #[serde(default)]
    pub customer: CustomerRefs,
    /// Delivery address.
    #[serde(default)]
    pub address_id: Option<AddressId>,
}

/// Result of order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// The created or previously created order.
    pub order: Order,
    /// `true` when the order was returned through its idempotency key.
    pub replayed: bool,
}

/// Order mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderCommand: Send + Sync {
    /// Validate, price and atomically commit an order.
    async fn create_order(&self, request: CreateOrderRequest)
    -> Result<CreateOrderResponse, Error>;

    /// Create an order from a cart's lines and convert the cart.
    async fn create_order_from_cart(
        &self,
        request: CreateOrderFromCartRequest,
    ) -> Result<CreateOrderResponse, Error>;

    /// Cancel a confirmed, unfulfilled order and restock its lines.
    async fn cancel_order(&self, id: &OrderId) -> Result<Order, Error>;
}

//! Driving ports for shopping carts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Cart, CartId, CartLineId, CustomerRefs, Error, ShopId, VariantId};

/// Request to open a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartRequest {
    /// Shop the cart belongs to.
    pub shop_id: ShopId,
    /// Owner references.
    #[serde(default)]
    pub customer: CustomerRefs,
}

/// Request to add a variant to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartLineRequest {
    /// Target cart.
    pub cart_id: CartId,
    /// Added variant.
    pub variant_id: VariantId,
    /// Raw quantity; must be positive.
    pub quantity: i64,
}

/// Request to drop a line from a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartLineRequest {
    /// Target cart.
    pub cart_id: CartId,
    /// Removed line.
    pub line_id: CartLineId,
}

/// Cart mutations. Each returns the refreshed cart with all lines.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartCommand: Send + Sync {
    /// Open an active, empty cart.
    async fn create_cart(&self, request: CreateCartRequest) -> Result<Cart, Error>;

    /// Add a variant, merging into an existing line for it.
    async fn add_line(&self, request: AddCartLineRequest) -> Result<Cart, Error>;

    /// Remove a line.
    async fn remove_line(&self, request: RemoveCartLineRequest) -> Result<Cart, Error>;
}

/// Cart reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartQuery: Send + Sync {
    /// Fetch a cart with its lines.
    async fn get_cart(&self, id: &CartId) -> Result<Cart, Error>;
}

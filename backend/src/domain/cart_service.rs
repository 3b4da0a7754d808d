//! Cart aggregation service.
//!
//! Carts accept any quantity of any variant of their shop while active.
//! Stock is deliberately not checked here; it only becomes authoritative
//! when the cart is converted into an order.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;

use super::service_errors::{map_cart_error, map_catalog_error, map_stock_error, variant_not_found};
use crate::domain::ports::{
    AddCartLineRequest, CartCommand, CartQuery, CartRepository, CatalogRepository,
    CreateCartRequest, RemoveCartLineRequest, VariantStockGateway,
};
use crate::domain::{Cart, CartError, CartId, CartLine, CartLineId, Error, Quantity};

/// Cart service implementing the cart driving ports.
#[derive(Clone)]
pub struct CartService<C, V, K> {
    cart_repo: Arc<C>,
    stock_gateway: Arc<V>,
    catalog_repo: Arc<K>,
    clock: Arc<dyn Clock>,
}

impl<C, V, K> CartService<C, V, K> {
    /// Create a new service with the given adapters.
    pub fn new(
        cart_repo: Arc<C>,
        stock_gateway: Arc<V>,
        catalog_repo: Arc<K>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cart_repo,
            stock_gateway,
            catalog_repo,
            clock,
        }
    }
}

pub(super) fn map_cart_state_error(error: CartError) -> Error {
    let message = error.to_string();
    match error {
        CartError::NotActive { .. } => Error::failed_precondition(message),
        CartError::LineNotFound { .. } => Error::not_found(message),
        CartError::QuantityOverflow { .. } => Error::invalid_request(message),
    }
}

impl<C, V, K> CartService<C, V, K>
where
    C: CartRepository,
    V: VariantStockGateway,
    K: CatalogRepository,
{
    async fn require_cart(&self, id: &CartId) -> Result<Cart, Error> {
        self.cart_repo
            .find_cart(id)
            .await
            .map_err(map_cart_error)?
            .ok_or_else(|| Error::not_found(format!("cart {id} not found")))
    }
}

#[async_trait]
impl<C, V, K> CartCommand for CartService<C, V, K>
where
    C: CartRepository,
    V: VariantStockGateway,
    K: CatalogRepository,
{
    async fn create_cart(&self, request: CreateCartRequest) -> Result<Cart, Error> {
        let shop_id = request.shop_id;
        self.catalog_repo
            .find_shop(&shop_id)
            .await
            .map_err(map_catalog_error)?
            .ok_or_else(|| Error::not_found(format!("shop {shop_id} not found")))?;

        let cart = Cart::open(CartId::random(), shop_id, request.customer, self.clock.utc());
        self.cart_repo
            .insert_cart(&cart)
            .await
            .map_err(map_cart_error)?;
        Ok(cart)
    }

    async fn add_line(&self, request: AddCartLineRequest) -> Result<Cart, Error> {
        let quantity = Quantity::new(request.quantity).map_err(|_| {
            Error::invalid_request(format!(
                "quantity must be positive for variant {}",
                request.variant_id
            ))
        })?;
        let cart = self.require_cart(&request.cart_id).await?;
        cart.ensure_active().map_err(map_cart_state_error)?;

        let variant = self
            .stock_gateway
            .find_variant(&request.variant_id)
            .await
            .map_err(map_stock_error)?
            .ok_or_else(|| variant_not_found(request.variant_id))?;
        if variant.shop_id() != cart.shop_id() {
            return Err(Error::invalid_request(format!(
                "variant {} does not belong to shop {}",
                variant.id(),
                cart.shop_id()
            )));
        }

        // Merge on a copy first so overflow is reported before any write.
        let mut preview = cart;
        let line = preview
            .merge_line(CartLineId::random(), variant.id(), quantity)
            .map_err(map_cart_state_error)?;
        let requested = CartLine { quantity, ..line };
        self.cart_repo
            .merge_line(&request.cart_id, &requested)
            .await
            .map_err(map_cart_error)?;

        self.require_cart(&request.cart_id).await
    }

    async fn remove_line(&self, request: RemoveCartLineRequest) -> Result<Cart, Error> {
        let mut cart = self.require_cart(&request.cart_id).await?;
        cart.remove_line(request.line_id)
            .map_err(map_cart_state_error)?;
        self.cart_repo
            .remove_line(&request.cart_id, &request.line_id)
            .await
            .map_err(map_cart_error)?;

        self.require_cart(&request.cart_id).await
    }
}

#[async_trait]
impl<C, V, K> CartQuery for CartService<C, V, K>
where
    C: CartRepository,
    V: VariantStockGateway,
    K: CatalogRepository,
{
    async fn get_cart(&self, id: &CartId) -> Result<Cart, Error> {
        self.require_cart(id).await
    }
}

#[cfg(test)]
#[path = "cart_service_tests.rs"]
mod tests;

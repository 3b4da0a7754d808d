//! Port for cart persistence.
//!
//! Line merges and the `Active` to `Converted` transition are expressed as
//! single conditional writes so adapters can apply them atomically.

use async_trait::async_trait;

use crate::domain::{Cart, CartId, CartLine, CartLineId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by cart repository adapters.
    pub enum CartRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "cart repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "cart repository query failed: {message}",
        /// The cart does not exist.
        CartNotFound { cart_id: CartId } =>
            "cart {cart_id} not found",
        /// The cart is no longer active.
        NotActive { cart_id: CartId } =>
            "cart {cart_id} is not active",
        /// The line is not part of the cart.
        LineNotFound { line_id: CartLineId } =>
            "cart line {line_id} not found",
    }
}

/// Port for cart storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Persist a new cart.
    async fn insert_cart(&self, cart: &Cart) -> Result<(), CartRepositoryError>;

    /// Fetch a cart with its lines in insertion order.
    async fn find_cart(&self, id: &CartId) -> Result<Option<Cart>, CartRepositoryError>;

    /// Add `line.quantity` to the cart's line for `line.variant_id`, or
    /// insert `line` when the cart has none. The cart must be active.
    async fn merge_line(
        &self,
        cart_id: &CartId,
        line: &CartLine,
    ) -> Result<CartLine, CartRepositoryError>;

    /// Delete a line from an active cart.
    async fn remove_line(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
    ) -> Result<(), CartRepositoryError>;
}

/// Fixture implementation that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCartRepository;

#[async_trait]
impl CartRepository for FixtureCartRepository {
    async fn insert_cart(&self, _cart: &Cart) -> Result<(), CartRepositoryError> {
        Ok(())
    }

    async fn find_cart(&self, _id: &CartId) -> Result<Option<Cart>, CartRepositoryError> {
        Ok(None)
    }

    async fn merge_line(
        &self,
        _cart_id: &CartId,
        line: &CartLine,
    ) -> Result<CartLine, CartRepositoryError> {
        Ok(*line)
    }

    async fn remove_line(
        &self,
        _cart_id: &CartId,
        line_id: &CartLineId,
    ) -> Result<(), CartRepositoryError> {
        Err(CartRepositoryError::line_not_found(*line_id))
    }
}

//! Port for variant lookup and the atomic stock primitives.
//!
//! `stock_quantity` is the single shared mutable resource of the order
//! engine. Adapters must implement [`VariantStockGateway::decrement_stock`]
//! as one conditional update (`stock >= quantity` checked and applied by the
//! datastore), never as a read followed by a write.

use async_trait::async_trait;

use crate::domain::{Quantity, Variant, VariantId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by stock gateway adapters.
    pub enum VariantStockError {
        /// Gateway connection could not be established.
        Connection { message: String } =>
            "stock gateway connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "stock gateway query failed: {message}",
        /// The variant does not exist.
        VariantNotFound { variant_id: VariantId } =>
            "variant {variant_id} not found",
        /// The conditional decrement found less stock than requested.
        InsufficientStock { variant_id: VariantId } =>
            "insufficient stock for variant {variant_id}",
    }
}

/// Port for reading variants and mutating their stock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VariantStockGateway: Send + Sync {
    /// Fetch a variant with its currently visible stock.
    async fn find_variant(&self, id: &VariantId) -> Result<Option<Variant>, VariantStockError>;

    /// Atomically remove `quantity` units, failing with
    /// [`VariantStockError::InsufficientStock`] and changing nothing when
    /// fewer are available. Returns the stock left.
    async fn decrement_stock(
        &self,
        id: &VariantId,
        quantity: Quantity,
    ) -> Result<i64, VariantStockError>;

    /// Atomically add `quantity` units. Returns the new stock.
    async fn increment_stock(
        &self,
        id: &VariantId,
        quantity: Quantity,
    ) -> Result<i64, VariantStockError>;
}

/// Fixture gateway with no variants.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureVariantStockGateway;

#[async_trait]
impl VariantStockGateway for FixtureVariantStockGateway {
    async fn find_variant(&self, _id: &VariantId) -> Result<Option<Variant>, VariantStockError> {
        Ok(None)
    }

    async fn decrement_stock(
        &self,
        id: &VariantId,
        _quantity: Quantity,
    ) -> Result<i64, VariantStockError> {
        Err(VariantStockError::variant_not_found(*id))
    }

    async fn increment_stock(
        &self,
        id: &VariantId,
        _quantity: Quantity,
    ) -> Result<i64, VariantStockError> {
        Err(VariantStockError::variant_not_found(*id))
    }
}

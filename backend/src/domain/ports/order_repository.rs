//! Port for order persistence.
//!
//! [`OrderRepository::place_order`] is the commit point of order creation:
//! the header, every line, every conditional stock decrement and the
//! optional source-cart conversion succeed or fail together.

use async_trait::async_trait;

use crate::domain::{
    CartId, IdempotencyKey, Order, OrderId, OrderStatus, OrderStatuses, ShopId, VariantId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by order repository adapters.
    pub enum OrderRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "order repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "order repository query failed: {message}",
        /// Another order already holds the idempotency key.
        DuplicateIdempotencyKey { key: String } =>
            "idempotency key {key} is already used",
        /// A conditional stock decrement failed; nothing was written.
        InsufficientStock { variant_id: VariantId } =>
            "insufficient stock for variant {variant_id}",
        /// A line references a variant that no longer exists.
        VariantNotFound { variant_id: VariantId } =>
            "variant {variant_id} not found",
        /// The source cart was no longer active at commit time.
        CartNotActive { cart_id: CartId } =>
            "cart {cart_id} is not active",
        /// The source cart's lines no longer match the order's lines.
        CartChanged { cart_id: CartId } =>
            "cart {cart_id} changed during checkout",
        /// The order does not exist.
        NotFound { order_id: OrderId } =>
            "order {order_id} not found",
        /// The order is not in a state that allows cancellation.
        NotCancellable { order_id: OrderId, reason: String } =>
            "order {order_id} cannot be cancelled: {reason}",
    }
}

/// Normalised window for order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPage {
    /// Maximum rows to return; always positive.
    pub limit: i64,
    /// Rows to skip; never negative.
    pub offset: i64,
}

/// Port for order storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Atomically persist `order` with its lines, decrement stock for every
    /// line and, when `source_cart` is set, move that cart from active to
    /// converted.
    ///
    /// The source cart is locked for the conversion and its lines must
    /// still add up to the order's quantities per variant; otherwise
    /// [`OrderRepositoryError::CartChanged`] is returned.
    ///
    /// On [`OrderRepositoryError::InsufficientStock`],
    /// [`OrderRepositoryError::DuplicateIdempotencyKey`],
    /// [`OrderRepositoryError::CartNotActive`] or
    /// [`OrderRepositoryError::CartChanged`] nothing is written.
    async fn place_order(
        &self,
        order: &Order,
        source_cart: Option<CartId>,
    ) -> Result<(), OrderRepositoryError>;

    /// Fetch an order with its lines in position order.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderRepositoryError>;

    /// Fetch the order created under an idempotency key.
    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, OrderRepositoryError>;

    /// List a shop's orders, newest first.
    async fn list_by_shop(
        &self,
        shop_id: &ShopId,
        page: OrderPage,
    ) -> Result<Vec<Order>, OrderRepositoryError>;

    /// Replace the status fields when the current lifecycle status equals
    /// `expected`. Returns `false` when the order was in another status.
    async fn update_statuses(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        statuses: OrderStatuses,
    ) -> Result<bool, OrderRepositoryError>;

    /// Atomically cancel a confirmed, unfulfilled order and return every
    /// line's quantity to stock. Returns the cancelled order.
    async fn cancel_order(&self, id: &OrderId) -> Result<Order, OrderRepositoryError>;
}

/// Fixture implementation that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureOrderRepository;

#[async_trait]
impl OrderRepository for FixtureOrderRepository {
    async fn place_order(
        &self,
        _order: &Order,
        _source_cart: Option<CartId>,
    ) -> Result<(), OrderRepositoryError> {
        Ok(())
    }

    async fn find_by_id(&self, _id: &OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(None)
    }

    async fn find_by_idempotency_key(
        &self,
        _key: &IdempotencyKey,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(None)
    }

    async fn list_by_shop(
        &self,
        _shop_id: &ShopId,
        _page: OrderPage,
    ) -> Result<Vec<Order>, OrderRepositoryError> {
        Ok(Vec::new())
    }

    async fn update_statuses(
        &self,
        _id: &OrderId,
        _expected: OrderStatus,
        _statuses: OrderStatuses,
    ) -> Result<bool, OrderRepositoryError> {
        Ok(false)
    }

    async fn cancel_order(&self, id: &OrderId) -> Result<Order, OrderRepositoryError> {
        Err(OrderRepositoryError::not_found(*id))
    }
}

//! Port for fulfilment persistence.
//!
//! [`FulfilmentRepository::record_fulfilment`] must evaluate
//! [`check_fulfilment`](crate::domain::check_fulfilment) and insert the
//! fulfilment while holding a per-order lock, so concurrent shipments can
//! never push an order line past its ordered quantity.

use async_trait::async_trait;

use crate::domain::{
    FulfilledQuantities, Fulfilment, FulfilmentError, FulfilmentId, FulfilmentStatus, OrderId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by fulfilment repository adapters.
    pub enum FulfilmentRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "fulfilment repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "fulfilment repository query failed: {message}",
        /// The fulfilled order does not exist.
        OrderNotFound { order_id: OrderId } =>
            "order {order_id} not found",
        /// The fulfilment does not exist.
        NotFound { fulfilment_id: FulfilmentId } =>
            "fulfilment {fulfilment_id} not found",
        /// The order's current state rejected the fulfilment.
        Rejected { reason: FulfilmentError } =>
            "{reason}",
        /// The stored status moved on since the fulfilment was read.
        StatusChanged { fulfilment_id: FulfilmentId, expected: FulfilmentStatus } =>
            "fulfilment {fulfilment_id} is no longer {expected}",
    }
}

/// Port for fulfilment storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FulfilmentRepository: Send + Sync {
    /// Check and insert a fulfilment under the order's lock.
    ///
    /// Returns the fulfilled quantities of the order including the new
    /// fulfilment.
    async fn record_fulfilment(
        &self,
        fulfilment: &Fulfilment,
    ) -> Result<FulfilledQuantities, FulfilmentRepositoryError>;

    /// Sum fulfilled quantities per order line across all fulfilments.
    async fn fulfilled_quantities(
        &self,
        order_id: &OrderId,
    ) -> Result<FulfilledQuantities, FulfilmentRepositoryError>;

    /// Fetch a fulfilment with its lines.
    async fn find_by_id(
        &self,
        id: &FulfilmentId,
    ) -> Result<Option<Fulfilment>, FulfilmentRepositoryError>;

    /// List an order's fulfilments, oldest first.
    async fn list_by_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<Fulfilment>, FulfilmentRepositoryError>;

    /// Persist status, carrier, tracking number and timestamps, provided the
    /// stored status still equals `expected`.
    ///
    /// Returns [`FulfilmentRepositoryError::StatusChanged`] when another
    /// update moved the status first; nothing is written in that case.
    async fn update(
        &self,
        fulfilment: &Fulfilment,
        expected: FulfilmentStatus,
    ) -> Result<(), FulfilmentRepositoryError>;
}

/// Fixture implementation that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureFulfilmentRepository;

#[async_trait]
impl FulfilmentRepository for FixtureFulfilmentRepository {
    async fn record_fulfilment(
        &self,
        fulfilment: &Fulfilment,
    ) -> Result<FulfilledQuantities, FulfilmentRepositoryError> {
        let mut fulfilled = FulfilledQuantities::new();
        for line in fulfilment.lines() {
            *fulfilled.entry(line.order_line_id).or_insert(0) += line.quantity.get();
        }
        Ok(fulfilled)
    }

    async fn fulfilled_quantities(
        &self,
        _order_id: &OrderId,
    ) -> Result<FulfilledQuantities, FulfilmentRepositoryError> {
        Ok(FulfilledQuantities::new())
    }

    async fn find_by_id(
        &self,
        _id: &FulfilmentId,
    ) -> Result<Option<Fulfilment>, FulfilmentRepositoryError> {
        Ok(None)
    }

    async fn list_by_order(
        &self,
        _order_id: &OrderId,
    ) -> Result<Vec<Fulfilment>, FulfilmentRepositoryError> {
        Ok(Vec::new())
    }

    async fn update(
        &self,
        fulfilment: &Fulfilment,
        _expected: FulfilmentStatus,
    ) -> Result<(), FulfilmentRepositoryError> {
        Err(FulfilmentRepositoryError::not_found(fulfilment.id()))
    }
}

//! Driving ports for fulfilment tracking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Error, Fulfilment, FulfilmentId, FulfilmentStatus, OrderId, OrderLineId};

/// One order line to ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfilmentLineRequest {
    /// Shipped order line.
    pub order_line_id: OrderLineId,
    /// Raw quantity; must be positive.
    pub quantity: i64,
}

/// Request to record a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFulfilmentRequest {
    /// Fulfilled order.
    pub order_id: OrderId,
    /// Shipped lines.
    pub lines: Vec<FulfilmentLineRequest>,
}

/// Request to change a shipment.
///
/// Only the fields named in `field_mask` are applied; an empty mask applies
/// `status`, `carrier` and `tracking_number`. Empty strings and
/// [`FulfilmentStatus::Unspecified`] leave their field unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFulfilmentRequest {
    /// Updated fulfilment.
    pub fulfilment_id: FulfilmentId,
    /// Paths to apply.
    #[serde(default)]
    pub field_mask: Vec<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<FulfilmentStatus>,
    /// New carrier.
    #[serde(default)]
    pub carrier: Option<String>,
    /// New tracking number.
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// Fulfilment mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FulfilmentCommand: Send + Sync {
    /// Record a shipment and recompute the order's status.
    ///
    /// Once the shipment is recorded the call succeeds; a failure to
    /// promote the order is logged and picked up by the next update.
    async fn create_fulfilment(&self, request: CreateFulfilmentRequest)
    -> Result<Fulfilment, Error>;

    /// Apply a masked update and recompute the order's status.
    async fn update_fulfilment(&self, request: UpdateFulfilmentRequest)
    -> Result<Fulfilment, Error>;
}

/// Fulfilment reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FulfilmentQuery: Send + Sync {
    /// Fetch a fulfilment with its lines.
    async fn get_fulfilment(&self, id: &FulfilmentId) -> Result<Fulfilment, Error>;

    /// List an order's fulfilments.
    async fn list_fulfilments(&self, order_id: &OrderId) -> Result<Vec<Fulfilment>, Error>;
}

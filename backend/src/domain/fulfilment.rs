//! Fulfilment aggregate and remaining-quantity rules.
//!
//! A fulfilment is one shipment covering some quantity of one or more order
//! lines. For every order line the quantities across all fulfilments must
//! never exceed the ordered quantity; [`check_fulfilment`] enforces that
//! bound and is evaluated by adapters inside the same atomic region that
//! persists the fulfilment.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    FulfilmentId, FulfilmentLineId, FulfilmentStatus, Order, OrderId, OrderLineId, OrderStatus,
    Quantity,
};

/// Fulfilled quantity per order line, summed across all fulfilments.
pub type FulfilledQuantities = BTreeMap<OrderLineId, i64>;

/// Errors raised by fulfilment rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FulfilmentError {
    /// The order has been cancelled.
    #[error("cannot fulfil a cancelled order")]
    OrderCancelled,
    /// No lines were requested.
    #[error("fulfilment must have at least one line")]
    EmptyLines,
    /// A requested order line does not belong to the order.
    #[error("order line {order_line_id} not found in order")]
    UnknownOrderLine {
        /// Offending order line.
        order_line_id: OrderLineId,
    },
    /// A requested quantity exceeds what is left to fulfil.
    #[error(
        "quantity {requested} exceeds remaining unfulfilled quantity {remaining} for order line {order_line_id}"
    )]
    QuantityExceeded {
        /// Offending order line.
        order_line_id: OrderLineId,
        /// Requested quantity.
        requested: i64,
        /// Quantity still unfulfilled.
        remaining: i64,
    },
    /// A status update tried to move backwards.
    #[error("fulfilment status cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: FulfilmentStatus,
        /// Requested status.
        to: FulfilmentStatus,
    },
}

/// One order line covered by a fulfilment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfilmentLine {
    /// Line identifier.
    pub id: FulfilmentLineId,
    /// Covered order line.
    pub order_line_id: OrderLineId,
    /// Quantity shipped in this fulfilment.
    pub quantity: Quantity,
}

/// Check a fulfilment request against an order and what is already
/// fulfilled.
///
/// Requests naming the same order line more than once are summed before the
/// remaining-quantity comparison.
pub fn check_fulfilment(
    order: &Order,
    requested: &[(OrderLineId, Quantity)],
    fulfilled: &FulfilledQuantities,
) -> Result<(), FulfilmentError> {
    if order.status() == OrderStatus::Cancelled {
        return Err(FulfilmentError::OrderCancelled);
    }
    if requested.is_empty() {
        return Err(FulfilmentError::EmptyLines);
    }

    let mut totals: BTreeMap<OrderLineId, i64> = BTreeMap::new();
    for (order_line_id, quantity) in requested {
        if order.line(*order_line_id).is_none() {
            return Err(FulfilmentError::UnknownOrderLine {
                order_line_id: *order_line_id,
            });
        }
        let entry = totals.entry(*order_line_id).or_insert(0);
        *entry = entry.saturating_add(quantity.get());
    }

    for (order_line_id, requested) in totals {
        let ordered = order
            .line(order_line_id)
            .map_or(0, |line| line.quantity.get());
        let already = fulfilled.get(&order_line_id).copied().unwrap_or(0);
        let remaining = ordered.saturating_sub(already).max(0);
        if requested > remaining {
            return Err(FulfilmentError::QuantityExceeded {
                order_line_id,
                requested,
                remaining,
            });
        }
    }
    Ok(())
}

/// Requested changes to a fulfilment; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FulfilmentChanges {
    /// New status.
    pub status: Option<FulfilmentStatus>,
    /// New carrier name.
    pub carrier: Option<String>,
    /// New tracking number.
    pub tracking_number: Option<String>,
}

/// A shipment against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fulfilment {
    id: FulfilmentId,
    order_id: OrderId,
    status: FulfilmentStatus,
    carrier: Option<String>,
    tracking_number: Option<String>,
    lines: Vec<FulfilmentLine>,
    created_at: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
}

/// Stored fulfilment fields used by [`Fulfilment::from_parts`].
#[derive(Debug, Clone)]
pub struct StoredFulfilment {
    /// Fulfilment identifier.
    pub id: FulfilmentId,
    /// Fulfilled order.
    pub order_id: OrderId,
    /// Shipment status.
    pub status: FulfilmentStatus,
    /// Carrier name.
    pub carrier: Option<String>,
    /// Tracking number.
    pub tracking_number: Option<String>,
    /// Covered lines.
    pub lines: Vec<FulfilmentLine>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time the shipment left.
    pub shipped_at: Option<DateTime<Utc>>,
    /// Time the shipment arrived.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Fulfilment {
    /// Create a pending fulfilment.
    pub fn pending(
        id: FulfilmentId,
        order_id: OrderId,
        lines: Vec<FulfilmentLine>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            status: FulfilmentStatus::Pending,
            carrier: None,
            tracking_number: None,
            lines,
            created_at,
            shipped_at: None,
            delivered_at: None,
        }
    }

    /// Rehydrate a fulfilment from storage.
    pub fn from_parts(stored: StoredFulfilment) -> Self {
        Self {
            id: stored.id,
            order_id: stored.order_id,
            status: stored.status,
            carrier: stored.carrier,
            tracking_number: stored.tracking_number,
            lines: stored.lines,
            created_at: stored.created_at,
            shipped_at: stored.shipped_at,
            delivered_at: stored.delivered_at,
        }
    }

    /// Fulfilment identifier.
    pub fn id(&self) -> FulfilmentId {
        self.id
    }

    /// Fulfilled order.
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Shipment status.
    pub fn status(&self) -> FulfilmentStatus {
        self.status
    }

    /// Carrier name.
    pub fn carrier(&self) -> Option<&str> {
        self.carrier.as_deref()
    }

    /// Tracking number.
    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    /// Covered lines.
    pub fn lines(&self) -> &[FulfilmentLine] {
        &self.lines
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time the shipment left.
    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    /// Time the shipment arrived.
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    /// Apply `changes`, stamping shipment timestamps on status moves.
    ///
    /// Returns `true` when any field changed.
    pub fn apply(&mut self, changes: FulfilmentChanges, now: DateTime<Utc>) -> Result<bool, FulfilmentError> {
        let mut changed = false;

        if let Some(next) = changes.status {
            if !self.status.can_transition_to(next) {
                return Err(FulfilmentError::InvalidTransition {
                    from: self.status,
                    to: next,
                });
            }
            if next != self.status {
                self.status = next;
                changed = true;
                if matches!(next, FulfilmentStatus::Shipped | FulfilmentStatus::Delivered) {
                    self.shipped_at.get_or_insert(now);
                }
                if next == FulfilmentStatus::Delivered {
                    self.delivered_at.get_or_insert(now);
                }
            }
        }

        if let Some(carrier) = changes.carrier {
            if self.carrier.as_deref() != Some(carrier.as_str()) {
                self.carrier = Some(carrier);
                changed = true;
            }
        }

        if let Some(tracking_number) = changes.tracking_number {
            if self.tracking_number.as_deref() != Some(tracking_number.as_str()) {
                self.tracking_number = Some(tracking_number);
                changed = true;
            }
        }

        Ok(changed)
    }
}

#[cfg(test)]
#[path = "fulfilment_tests.rs"]
mod tests;

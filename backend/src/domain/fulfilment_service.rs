//! Fulfilment tracking service.
//!
//! Creation validates the request against the order, hands the
//! authoritative remaining-quantity check to
//! [`FulfilmentRepository::record_fulfilment`], and then promotes the order
//! to `Fulfilled` once every line is covered. Promotion failures after the
//! fulfilment is committed are logged, not returned. Updates move a fulfilment
//! along `Pending -> Shipped -> Delivered` and re-run the same promotion on
//! a best-effort basis.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use super::service_errors::{fulfilment_rejected, map_fulfilment_error, map_order_error};
use crate::domain::ports::{
    CreateFulfilmentRequest, FulfilmentCommand, FulfilmentQuery, FulfilmentRepository,
    OrderRepository, UpdateFulfilmentRequest,
};
use crate::domain::{
    Error, FulfilledQuantities, Fulfilment, FulfilmentChanges, FulfilmentId, FulfilmentLine,
    FulfilmentLineId, FulfilmentStatus, Order, OrderId, OrderLineId, OrderStatus, Quantity,
    check_fulfilment,
};

/// Field mask paths accepted by [`FulfilmentCommand::update_fulfilment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FulfilmentField {
    /// `status`: advance the shipment one step.
    Status,
    /// `carrier`: replace the carrier name.
    Carrier,
    /// `tracking_number`: replace the carrier's tracking reference.
    TrackingNumber,
}

impl FulfilmentField {
    /// Fields applied when the caller sends an empty mask.
    pub const DEFAULT_MASK: [Self; 3] = [Self::Status, Self::Carrier, Self::TrackingNumber];

    /// Parse a single mask path.
    ///
    /// # Examples
    /// ```
    /// use commerce::domain::FulfilmentField;
    ///
    /// assert_eq!(
    ///     FulfilmentField::from_path("tracking_number").expect("known path"),
    ///     FulfilmentField::TrackingNumber
    /// );
    /// assert!(FulfilmentField::from_path("shipped_at").is_err());
    /// ```
    pub fn from_path(path: &str) -> Result<Self, Error> {
        match path.trim() {
            "status" => Ok(Self::Status),
            "carrier" => Ok(Self::Carrier),
            "tracking_number" => Ok(Self::TrackingNumber),
            other => Err(Error::invalid_request(format!(
                "unknown field mask path: {other}"
            ))),
        }
    }

    /// Parse a whole mask, falling back to [`Self::DEFAULT_MASK`] when empty.
    pub fn parse_mask(paths: &[String]) -> Result<Vec<Self>, Error> {
        if paths.is_empty() {
            return Ok(Self::DEFAULT_MASK.to_vec());
        }
        paths.iter().map(|path| Self::from_path(path)).collect()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn changes_for(mask: &[FulfilmentField], request: UpdateFulfilmentRequest) -> FulfilmentChanges {
    let mut changes = FulfilmentChanges::default();
    let UpdateFulfilmentRequest {
        status,
        carrier,
        tracking_number,
        ..
    } = request;
    if mask.contains(&FulfilmentField::Status) {
        changes.status = status.filter(|status| *status != FulfilmentStatus::Unspecified);
    }
    if mask.contains(&FulfilmentField::Carrier) {
        changes.carrier = non_blank(carrier);
    }
    if mask.contains(&FulfilmentField::TrackingNumber) {
        changes.tracking_number = non_blank(tracking_number);
    }
    changes
}

/// Fulfilment service implementing the fulfilment driving ports.
#[derive(Clone)]
pub struct FulfilmentService<F, O> {
    fulfilment_repo: Arc<F>,
    order_repo: Arc<O>,
    clock: Arc<dyn Clock>,
}

impl<F, O> FulfilmentService<F, O> {
    /// Create a new service with the given adapters.
    pub fn new(fulfilment_repo: Arc<F>, order_repo: Arc<O>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fulfilment_repo,
            order_repo,
            clock,
        }
    }
}

impl<F, O> FulfilmentService<F, O>
where
    F: FulfilmentRepository,
    O: OrderRepository,
{
    async fn require_order(&self, id: &OrderId) -> Result<Order, Error> {
        self.order_repo
            .find_by_id(id)
            .await
            .map_err(map_order_error)?
            .ok_or_else(|| Error::not_found(format!("order {id} not found")))
    }

    /// Promote the order when `fulfilled` covers every line.
    async fn promote_order(&self, order: &Order, fulfilled: &FulfilledQuantities) -> Result<(), Error> {
        let Some(statuses) = order.recompute_fulfilment(fulfilled) else {
            return Ok(());
        };
        let updated = self
            .order_repo
            .update_statuses(&order.id(), OrderStatus::Confirmed, statuses)
            .await
            .map_err(map_order_error)?;
        if updated {
            info!(order_id = %order.id(), status = %statuses.status, "order fulfilment recomputed");
        } else {
            warn!(order_id = %order.id(), "order left confirmed state before fulfilment recompute");
        }
        Ok(())
    }

    async fn recompute_best_effort(&self, order_id: &OrderId) {
        let order = match self.order_repo.find_by_id(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(order_id = %order_id, "order missing during fulfilment recompute");
                return;
            }
            Err(error) => {
                warn!(order_id = %order_id, error = %error, "order reload failed; skipping recompute");
                return;
            }
        };
        let fulfilled = match self.fulfilment_repo.fulfilled_quantities(order_id).await {
            Ok(fulfilled) => fulfilled,
            Err(error) => {
                warn!(order_id = %order_id, error = %error, "fulfilled quantities unavailable; skipping recompute");
                return;
            }
        };
        if let Err(error) = self.promote_order(&order, &fulfilled).await {
            warn!(order_id = %order_id, error = %error, "order fulfilment recompute failed");
        }
    }
}

#[async_trait]
impl<F, O> FulfilmentCommand for FulfilmentService<F, O>
where
    F: FulfilmentRepository,
    O: OrderRepository,
{
    async fn create_fulfilment(&self, request: CreateFulfilmentRequest) -> Result<Fulfilment, Error> {
        let order = self.require_order(&request.order_id).await?;

        let mut requested: Vec<(OrderLineId, Quantity)> = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let quantity = Quantity::new(line.quantity).map_err(|_| {
                Error::invalid_request(format!(
                    "quantity must be positive for order line {}",
                    line.order_line_id
                ))
            })?;
            requested.push((line.order_line_id, quantity));
        }
        // Shape checks only; remaining quantities are checked under the order lock.
        check_fulfilment(&order, &requested, &FulfilledQuantities::new())
            .map_err(|reason| fulfilment_rejected(&reason))?;

        let lines = requested
            .into_iter()
            .map(|(order_line_id, quantity)| FulfilmentLine {
                id: FulfilmentLineId::random(),
                order_line_id,
                quantity,
            })
            .collect();
        let fulfilment = Fulfilment::pending(FulfilmentId::random(), order.id(), lines, self.clock.utc());
        let fulfilled = self
            .fulfilment_repo
            .record_fulfilment(&fulfilment)
            .await
            .map_err(map_fulfilment_error)?;
        info!(
            fulfilment_id = %fulfilment.id(),
            order_id = %order.id(),
            lines = fulfilment.lines().len(),
            "fulfilment recorded"
        );

        // The fulfilment is committed; a retry would only trip the quantity check.
        if let Err(error) = self.promote_order(&order, &fulfilled).await {
            warn!(order_id = %order.id(), error = %error, "order promotion failed after fulfilment");
        }
        Ok(fulfilment)
    }

    async fn update_fulfilment(&self, request: UpdateFulfilmentRequest) -> Result<Fulfilment, Error> {
        let mask = FulfilmentField::parse_mask(&request.field_mask)?;
        let id = request.fulfilment_id;
        let mut fulfilment = self
            .fulfilment_repo
            .find_by_id(&id)
            .await
            .map_err(map_fulfilment_error)?
            .ok_or_else(|| Error::not_found(format!("fulfilment {id} not found")))?;

        let read_status = fulfilment.status();
        let changed = fulfilment
            .apply(changes_for(&mask, request), self.clock.utc())
            .map_err(|reason| fulfilment_rejected(&reason))?;
        if changed {
            self.fulfilment_repo
                .update(&fulfilment, read_status)
                .await
                .map_err(map_fulfilment_error)?;
            info!(fulfilment_id = %id, status = %fulfilment.status(), "fulfilment updated");
        }

        self.recompute_best_effort(&fulfilment.order_id()).await;
        Ok(fulfilment)
    }
}

#[async_trait]
impl<F, O> FulfilmentQuery for FulfilmentService<F, O>
where
    F: FulfilmentRepository,
    O: OrderRepository,
{
    async fn get_fulfilment(&self, id: &FulfilmentId) -> Result<Fulfilment, Error> {
        self.fulfilment_repo
            .find_by_id(id)
            .await
            .map_err(map_fulfilment_error)?
            .ok_or_else(|| Error::not_found(format!("fulfilment {id} not found")))
    }

    async fn list_fulfilments(&self, order_id: &OrderId) -> Result<Vec<Fulfilment>, Error> {
        self.require_order(order_id).await?;
        self.fulfilment_repo
            .list_by_order(order_id)
            .await
            .map_err(map_fulfilment_error)
    }
}

#[cfg(test)]
#[path = "fulfilment_service_tests.rs"]
mod tests;

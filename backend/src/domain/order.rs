//! Order aggregate and line pricing.
//!
//! An order is immutable after creation except for its three status
//! fields. Lines carry a snapshot of the variant's SKU, name, and unit
//! price taken at creation time together with the line total, computed once
//! with exact fixed-point arithmetic and never recomputed from the catalog.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    AddressId, CurrencyCode, CustomerRefs, FulfilledQuantities, FulfilmentStatus, IdempotencyKey,
    Money, MoneyError, OrderId, OrderLineId, OrderStatus, PaymentStatus, Quantity, ShopId,
    Variant, VariantId,
};

/// Human-readable, unique order number such as `ORD-20260214-3FA94C21B0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Build an order number from the placement time and a random seed.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use commerce::domain::OrderNumber;
    /// use uuid::Uuid;
    ///
    /// let at = Utc.with_ymd_and_hms(2026, 2, 14, 9, 0, 0).single().expect("valid date");
    /// let number = OrderNumber::generate(at, Uuid::nil());
    /// assert_eq!(number.as_ref(), "ORD-20260214-0000000000");
    /// ```
    pub fn generate(placed_at: DateTime<Utc>, seed: Uuid) -> Self {
        let suffix: String = seed
            .simple()
            .to_string()
            .to_uppercase()
            .chars()
            .take(10)
            .collect();
        Self(format!("ORD-{}-{suffix}", placed_at.format("%Y%m%d")))
    }

    /// Rehydrate a stored order number.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Errors raised while pricing order lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// No lines were priced.
    #[error("order must have at least one line")]
    EmptyOrder,
    /// A line was priced in a different currency than the first line.
    #[error("variant {variant_id} is priced in {actual}, but the order currency is {expected}")]
    CurrencyMismatch {
        /// Offending variant.
        variant_id: VariantId,
        /// Order currency fixed by the first line.
        expected: CurrencyCode,
        /// Currency of the offending variant.
        actual: CurrencyCode,
    },
    /// The line total or subtotal overflowed.
    #[error("order total overflowed while pricing variant {variant_id}")]
    Overflow {
        /// Variant being priced when the overflow happened.
        variant_id: VariantId,
    },
}

/// One priced line with its catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Line identifier.
    pub id: OrderLineId,
    /// Ordered variant.
    pub variant_id: VariantId,
    /// SKU at order time.
    pub sku_snapshot: String,
    /// Variant name at order time.
    pub name_snapshot: String,
    /// Unit price at order time.
    pub unit_price: Money,
    /// Ordered quantity.
    pub quantity: Quantity,
    /// `unit_price * quantity`, computed once.
    pub line_total: Money,
}

/// Lines priced so far plus the running subtotal.
///
/// The order currency is fixed by the first line. The subtotal is carried
/// after every addition, so it is a valid [`Money`] at every step.
#[derive(Debug, Clone, Default)]
pub struct OrderPricing {
    lines: Vec<OrderLine>,
    subtotal: Option<Money>,
}

impl OrderPricing {
    /// Start an empty pricing run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `variant` and price `quantity` units of it.
    ///
    /// # Examples
    /// ```
    /// use commerce::domain::{
    ///     Money, OrderLineId, OrderPricing, Product, ProductId, Quantity, ShopId, Variant,
    ///     VariantDraft, VariantId,
    /// };
    ///
    /// let product = Product::new(ProductId::random(), ShopId::random(), "Beans").expect("valid");
    /// let variant = Variant::new(VariantDraft {
    ///     id: VariantId::random(),
    ///     product: &product,
    ///     sku: "SKU-X",
    ///     name: "250g",
    ///     unit_price: Money::new("USD", 10, 500_000_000).expect("valid"),
    ///     stock_quantity: 100,
    /// })
    /// .expect("valid variant");
    ///
    /// let mut pricing = OrderPricing::new();
    /// pricing
    ///     .add_line(OrderLineId::random(), &variant, Quantity::new(3).expect("positive"))
    ///     .expect("priced");
    /// let priced = pricing.finish().expect("non-empty");
    /// assert_eq!((priced.subtotal.units(), priced.subtotal.nanos()), (31, 500_000_000));
    /// ```
    pub fn add_line(
        &mut self,
        line_id: OrderLineId,
        variant: &Variant,
        quantity: Quantity,
    ) -> Result<(), PricingError> {
        let variant_id = variant.id();
        let unit_price = variant.unit_price();
        let overflow = |_: MoneyError| PricingError::Overflow { variant_id };

        if let Some(expected) = self.subtotal.map(|subtotal| subtotal.currency()) {
            if expected != unit_price.currency() {
                return Err(PricingError::CurrencyMismatch {
                    variant_id,
                    expected,
                    actual: unit_price.currency(),
                });
            }
        }

        let line_total = unit_price.checked_mul(quantity.get()).map_err(overflow)?;
        let subtotal = self
            .subtotal
            .unwrap_or_else(|| Money::zero(unit_price.currency()))
            .checked_add(&line_total)
            .map_err(overflow)?;

        self.subtotal = Some(subtotal);
        self.lines.push(OrderLine {
            id: line_id,
            variant_id,
            sku_snapshot: variant.sku().to_owned(),
            name_snapshot: variant.name().to_owned(),
            unit_price,
            quantity,
            line_total,
        });
        Ok(())
    }

    /// Finish pricing, returning the lines and their subtotal.
    pub fn finish(self) -> Result<PricedOrder, PricingError> {
        let subtotal = self.subtotal.ok_or(PricingError::EmptyOrder)?;
        Ok(PricedOrder {
            lines: self.lines,
            subtotal,
        })
    }
}

/// Output of [`OrderPricing::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    /// Priced lines in request order.
    pub lines: Vec<OrderLine>,
    /// Sum of all line totals.
    pub subtotal: Money,
}

/// Input for [`Order::place`].
#[derive(Debug, Clone)]
pub struct OrderDraft {
    /// New order identifier.
    pub id: OrderId,
    /// Shop the order is placed with.
    pub shop_id: ShopId,
    /// Generated order number.
    pub order_number: OrderNumber,
    /// Caller-supplied idempotency key, if any.
    pub idempotency_key: Option<IdempotencyKey>,
    /// Owner references.
    pub customer: CustomerRefs,
    /// Delivery address.
    pub address_id: Option<AddressId>,
    /// Priced lines.
    pub priced: PricedOrder,
    /// Placement time.
    pub placed_at: DateTime<Utc>,
}

/// Status fields, the only mutable part of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatuses {
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Order-level fulfilment summary.
    pub fulfilment_status: FulfilmentStatus,
}

/// A placed order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    shop_id: ShopId,
    order_number: OrderNumber,
    idempotency_key: IdempotencyKey,
    #[serde(flatten)]
    statuses: OrderStatuses,
    customer: CustomerRefs,
    address_id: Option<AddressId>,
    subtotal: Money,
    total: Money,
    lines: Vec<OrderLine>,
    created_at: DateTime<Utc>,
}

/// Stored order fields used by [`Order::from_parts`].
#[derive(Debug, Clone)]
pub struct StoredOrder {
    /// Order identifier.
    pub id: OrderId,
    /// Owning shop.
    pub shop_id: ShopId,
    /// Order number.
    pub order_number: OrderNumber,
    /// Idempotency key.
    pub idempotency_key: IdempotencyKey,
    /// Status fields.
    pub statuses: OrderStatuses,
    /// Owner references.
    pub customer: CustomerRefs,
    /// Delivery address.
    pub address_id: Option<AddressId>,
    /// Stored subtotal.
    pub subtotal: Money,
    /// Stored total.
    pub total: Money,
    /// Lines in position order.
    pub lines: Vec<OrderLine>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a confirmed order from priced lines.
    ///
    /// Without discounts or taxes the total equals the subtotal. A missing
    /// idempotency key is replaced by the order number.
    pub fn place(draft: OrderDraft) -> Self {
        let idempotency_key = draft
            .idempotency_key
            .unwrap_or_else(|| IdempotencyKey::from_order_number(&draft.order_number));
        Self {
            id: draft.id,
            shop_id: draft.shop_id,
            order_number: draft.order_number,
            idempotency_key,
            statuses: OrderStatuses {
                status: OrderStatus::Confirmed,
                payment_status: PaymentStatus::Pending,
                fulfilment_status: FulfilmentStatus::Unspecified,
            },
            customer: draft.customer,
            address_id: draft.address_id,
            subtotal: draft.priced.subtotal,
            total: draft.priced.subtotal,
            lines: draft.priced.lines,
            created_at: draft.placed_at,
        }
    }

    /// Rehydrate an order from storage.
    pub fn from_parts(stored: StoredOrder) -> Self {
        Self {
            id: stored.id,
            shop_id: stored.shop_id,
            order_number: stored.order_number,
            idempotency_key: stored.idempotency_key,
            statuses: stored.statuses,
            customer: stored.customer,
            address_id: stored.address_id,
            subtotal: stored.subtotal,
            total: stored.total,
            lines: stored.lines,
            created_at: stored.created_at,
        }
    }

    /// Order identifier.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Replace the status fields, the only part of an order that changes
    /// after placement.
    #[must_use]
    pub fn with_statuses(mut self, statuses: OrderStatuses) -> Self {
        self.statuses = statuses;
        self
    }

    /// Owning shop.
    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    /// Order number.
    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    /// Idempotency key (the order number when none was supplied).
    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.idempotency_key
    }

    /// All status fields.
    pub fn statuses(&self) -> OrderStatuses {
        self.statuses
    }

    /// Lifecycle status.
    pub fn status(&self) -> OrderStatus {
        self.statuses.status
    }

    /// Payment status.
    pub fn payment_status(&self) -> PaymentStatus {
        self.statuses.payment_status
    }

    /// Order-level fulfilment status.
    pub fn fulfilment_status(&self) -> FulfilmentStatus {
        self.statuses.fulfilment_status
    }

    /// Owner references.
    pub fn customer(&self) -> CustomerRefs {
        self.customer
    }

    /// Delivery address.
    pub fn address_id(&self) -> Option<AddressId> {
        self.address_id
    }

    /// Sum of line totals.
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Amount due.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Lines in position order.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Find a line of this order.
    pub fn line(&self, line_id: OrderLineId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.id == line_id)
    }

    /// Return `true` when every line's fulfilled quantity has reached its
    /// ordered quantity.
    pub fn is_fully_fulfilled(&self, fulfilled: &FulfilledQuantities) -> bool {
        self.lines.iter().all(|line| {
            fulfilled.get(&line.id).copied().unwrap_or(0) >= line.quantity.get()
        })
    }

    /// Statuses the order should carry given the fulfilled quantities, or
    /// `None` when nothing changes.
    ///
    /// Only full completion is observable at the order level: the order
    /// becomes fulfilled and its fulfilment summary delivered.
    pub fn recompute_fulfilment(&self, fulfilled: &FulfilledQuantities) -> Option<OrderStatuses> {
        if self.statuses.status != OrderStatus::Confirmed || !self.is_fully_fulfilled(fulfilled) {
            return None;
        }
        Some(OrderStatuses {
            status: OrderStatus::Fulfilled,
            payment_status: self.statuses.payment_status,
            fulfilment_status: FulfilmentStatus::Delivered,
        })
    }
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;

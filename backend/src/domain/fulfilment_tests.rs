//! Tests for remaining-quantity checks and shipment status updates.

use chrono::{Duration, TimeZone};
use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;
use crate::domain::{
    CustomerRefs, Money, OrderDraft, OrderNumber, OrderPricing, Product, ProductId, ShopId,
    Variant, VariantDraft, VariantId,
};

fn qty(value: i64) -> Quantity {
    Quantity::new(value).expect("positive quantity")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// An order with a single line of five units.
#[fixture]
fn order() -> Order {
    let product =
        Product::new(ProductId::random(), ShopId::random(), "House Blend").expect("product");
    let variant = Variant::new(VariantDraft {
        id: VariantId::random(),
        product: &product,
        sku: "SKU-X",
        name: "250g",
        unit_price: Money::new("USD", 10, 500_000_000).expect("money"),
        stock_quantity: 100,
    })
    .expect("variant");
    let mut pricing = OrderPricing::new();
    pricing
        .add_line(OrderLineId::random(), &variant, qty(5))
        .expect("priced");
    Order::place(OrderDraft {
        id: OrderId::random(),
        shop_id: product.shop_id(),
        order_number: OrderNumber::generate(now(), Uuid::new_v4()),
        idempotency_key: None,
        customer: CustomerRefs::default(),
        address_id: None,
        priced: pricing.finish().expect("non-empty"),
        placed_at: now(),
    })
}

fn first_line(order: &Order) -> OrderLineId {
    order.lines()[0].id
}

#[fixture]
fn fulfilment() -> Fulfilment {
    Fulfilment::pending(FulfilmentId::random(), OrderId::random(), Vec::new(), now())
}

#[rstest]
fn accepts_partial_quantity(order: Order) {
    let line = first_line(&order);
    assert!(check_fulfilment(&order, &[(line, qty(3))], &FulfilledQuantities::new()).is_ok());
}

#[rstest]
fn rejects_quantity_beyond_remaining(order: Order) {
    let line = first_line(&order);
    let fulfilled = FulfilledQuantities::from([(line, 3)]);
    let error = check_fulfilment(&order, &[(line, qty(3))], &fulfilled).expect_err("exceeds");
    assert_eq!(
        error,
        FulfilmentError::QuantityExceeded {
            order_line_id: line,
            requested: 3,
            remaining: 2,
        }
    );
}

#[rstest]
fn sums_duplicate_line_references(order: Order) {
    let line = first_line(&order);
    let error = check_fulfilment(&order, &[(line, qty(3)), (line, qty(3))], &FulfilledQuantities::new())
        .expect_err("summed request exceeds ordered quantity");
    assert!(matches!(error, FulfilmentError::QuantityExceeded { requested: 6, remaining: 5, .. }));
}

#[rstest]
fn rejects_foreign_order_line(order: Order) {
    let stranger = OrderLineId::random();
    let error = check_fulfilment(&order, &[(stranger, qty(1))], &FulfilledQuantities::new())
        .expect_err("unknown line");
    assert_eq!(error, FulfilmentError::UnknownOrderLine { order_line_id: stranger });
    assert_eq!(error.to_string(), format!("order line {stranger} not found in order"));
}

#[rstest]
fn rejects_empty_request(order: Order) {
    assert_eq!(
        check_fulfilment(&order, &[], &FulfilledQuantities::new()),
        Err(FulfilmentError::EmptyLines)
    );
}

#[rstest]
fn shipping_stamps_shipped_at(mut fulfilment: Fulfilment) {
    let changed = fulfilment
        .apply(
            FulfilmentChanges {
                status: Some(FulfilmentStatus::Shipped),
                carrier: Some("UPS".to_owned()),
                tracking_number: Some("1Z999".to_owned()),
            },
            now(),
        )
        .expect("forward transition");

    assert!(changed);
    assert_eq!(fulfilment.status(), FulfilmentStatus::Shipped);
    assert_eq!(fulfilment.shipped_at(), Some(now()));
    assert_eq!(fulfilment.delivered_at(), None);
    assert_eq!(fulfilment.carrier(), Some("UPS"));
    assert_eq!(fulfilment.tracking_number(), Some("1Z999"));
}

#[rstest]
fn delivering_keeps_earlier_shipped_at(mut fulfilment: Fulfilment) {
    let shipped = FulfilmentChanges {
        status: Some(FulfilmentStatus::Shipped),
        ..FulfilmentChanges::default()
    };
    fulfilment.apply(shipped, now()).expect("ship");

    let later = now() + Duration::hours(30);
    let delivered = FulfilmentChanges {
        status: Some(FulfilmentStatus::Delivered),
        ..FulfilmentChanges::default()
    };
    fulfilment.apply(delivered, later).expect("deliver");

    assert_eq!(fulfilment.shipped_at(), Some(now()));
    assert_eq!(fulfilment.delivered_at(), Some(later));
}

#[rstest]
fn delivering_requires_shipping_first(mut fulfilment: Fulfilment) {
    let delivered = FulfilmentChanges {
        status: Some(FulfilmentStatus::Delivered),
        ..FulfilmentChanges::default()
    };
    let error = fulfilment.apply(delivered, now()).expect_err("skips shipped");
    assert_eq!(
        error,
        FulfilmentError::InvalidTransition {
            from: FulfilmentStatus::Pending,
            to: FulfilmentStatus::Delivered,
        }
    );
    assert_eq!(fulfilment.status(), FulfilmentStatus::Pending);
    assert_eq!(fulfilment.shipped_at(), None);
}

#[rstest]
fn rejects_backward_transition(mut fulfilment: Fulfilment) {
    for status in [FulfilmentStatus::Shipped, FulfilmentStatus::Delivered] {
        let step = FulfilmentChanges {
            status: Some(status),
            ..FulfilmentChanges::default()
        };
        fulfilment.apply(step, now()).expect("forward step");
    }

    let back = FulfilmentChanges {
        status: Some(FulfilmentStatus::Shipped),
        ..FulfilmentChanges::default()
    };
    let error = fulfilment.apply(back, now()).expect_err("backwards");
    assert_eq!(
        error,
        FulfilmentError::InvalidTransition {
            from: FulfilmentStatus::Delivered,
            to: FulfilmentStatus::Shipped,
        }
    );
}

#[rstest]
fn same_status_is_a_no_op(mut fulfilment: Fulfilment) {
    let pending = FulfilmentChanges {
        status: Some(FulfilmentStatus::Pending),
        ..FulfilmentChanges::default()
    };
    assert_eq!(fulfilment.apply(pending, now()), Ok(false));
    assert_eq!(fulfilment.shipped_at(), None);
}

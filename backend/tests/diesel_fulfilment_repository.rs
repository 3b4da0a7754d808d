//! Integration tests for `DieselFulfilmentRepository`.
//!
//! Covers the per-order lock that bounds shipped quantities and the
//! status-guarded update, both against embedded PostgreSQL.

use commerce::domain::ports::{FulfilmentRepository, FulfilmentRepositoryError, OrderRepository};
use commerce::domain::{
    Fulfilment, FulfilmentChanges, FulfilmentError, FulfilmentId, FulfilmentLine,
    FulfilmentLineId, FulfilmentStatus, Order, OrderId, Quantity,
};
use commerce::test_support::fixture_timestamp;
use rstest::rstest;

mod support;

use support::pg_commerce::{PgCommerce, pg_commerce, priced_order};

/// Single-unit shipments racing for an order of five.
const RACING_SHIPMENTS: usize = 8;

fn shipment(order_id: OrderId, order: &Order, quantity: i64) -> Fulfilment {
    Fulfilment::pending(
        FulfilmentId::random(),
        order_id,
        vec![FulfilmentLine {
            id: FulfilmentLineId::random(),
            order_line_id: order.lines()[0].id,
            quantity: Quantity::new(quantity).expect("positive quantity"),
        }],
        fixture_timestamp(),
    )
}

async fn order_of_five(context: &PgCommerce) -> Order {
    let (shop_id, variants) = context.shop_with_variants(&[("SKU-X", 20)]).await;
    let order = priced_order(shop_id, None, &[(&variants[0], 5)]);
    context
        .orders
        .place_order(&order, None)
        .await
        .expect("order placed");
    order
}

#[rstest]
fn concurrent_shipments_stop_at_the_ordered_quantity(pg_commerce: Option<PgCommerce>) {
    let Some(context) = pg_commerce else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_shipments_stop_at_the_ordered_quantity skipped");
        return;
    };

    context.runtime.block_on(async {
        let order = order_of_five(&context).await;
        let line_id = order.lines()[0].id;

        let attempts: Vec<_> = (0..RACING_SHIPMENTS)
            .map(|_| {
                let fulfilments = context.fulfilments.clone();
                let fulfilment = shipment(order.id(), &order, 1);
                tokio::spawn(async move { fulfilments.record_fulfilment(&fulfilment).await })
            })
            .collect();
        let mut recorded = 0;
        for attempt in attempts {
            match attempt.await.expect("shipment task completed") {
                Ok(fulfilled) => {
                    recorded += 1;
                    assert!(fulfilled[&line_id] <= 5, "over-shipped: {fulfilled:?}");
                }
                Err(FulfilmentRepositoryError::Rejected {
                    reason: FulfilmentError::QuantityExceeded { remaining, .. },
                }) => assert_eq!(remaining, 0),
                Err(error) => panic!("unexpected failure: {error}"),
            }
        }

        assert_eq!(recorded, 5);
        let fulfilled = context
            .fulfilments
            .fulfilled_quantities(&order.id())
            .await
            .expect("quantities");
        assert_eq!(fulfilled.get(&line_id), Some(&5));
        let listed = context
            .fulfilments
            .list_by_order(&order.id())
            .await
            .expect("listing");
        assert_eq!(listed.len(), 5);
    });
}

#[rstest]
fn oversized_shipment_is_rejected_whole(pg_commerce: Option<PgCommerce>) {
    let Some(context) = pg_commerce else {
        eprintln!("SKIP-TEST-CLUSTER: oversized_shipment_is_rejected_whole skipped");
        return;
    };

    context.runtime.block_on(async {
        let order = order_of_five(&context).await;
        context
            .fulfilments
            .record_fulfilment(&shipment(order.id(), &order, 4))
            .await
            .expect("first shipment");

        let error = context
            .fulfilments
            .record_fulfilment(&shipment(order.id(), &order, 2))
            .await
            .expect_err("one unit remains");

        assert_eq!(
            error,
            FulfilmentRepositoryError::rejected(FulfilmentError::QuantityExceeded {
                order_line_id: order.lines()[0].id,
                requested: 2,
                remaining: 1,
            })
        );
        let listed = context
            .fulfilments
            .list_by_order(&order.id())
            .await
            .expect("listing");
        assert_eq!(listed.len(), 1);
    });
}

#[rstest]
fn cancelled_or_missing_orders_reject_shipments(pg_commerce: Option<PgCommerce>) {
    let Some(context) = pg_commerce else {
        eprintln!("SKIP-TEST-CLUSTER: cancelled_or_missing_orders_reject_shipments skipped");
        return;
    };

    context.runtime.block_on(async {
        let order = order_of_five(&context).await;
        context
            .orders
            .cancel_order(&order.id())
            .await
            .expect("order cancelled");

        let error = context
            .fulfilments
            .record_fulfilment(&shipment(order.id(), &order, 1))
            .await
            .expect_err("cancelled orders do not ship");
        assert_eq!(
            error,
            FulfilmentRepositoryError::rejected(FulfilmentError::OrderCancelled)
        );

        let missing = OrderId::random();
        let error = context
            .fulfilments
            .record_fulfilment(&shipment(missing, &order, 1))
            .await
            .expect_err("order does not exist");
        assert_eq!(error, FulfilmentRepositoryError::order_not_found(missing));
    });
}

#[rstest]
fn update_requires_the_status_it_read(pg_commerce: Option<PgCommerce>) {
    let Some(context) = pg_commerce else {
        eprintln!("SKIP-TEST-CLUSTER: update_requires_the_status_it_read skipped");
        return;
    };

    context.runtime.block_on(async {
        let order = order_of_five(&context).await;
        let recorded = shipment(order.id(), &order, 2);
        context
            .fulfilments
            .record_fulfilment(&recorded)
            .await
            .expect("fulfilment recorded");

        let mut shipped = recorded.clone();
        shipped
            .apply(
                FulfilmentChanges {
                    status: Some(FulfilmentStatus::Shipped),
                    carrier: Some("Royal Mail".to_owned()),
                    ..FulfilmentChanges::default()
                },
                fixture_timestamp(),
            )
            .expect("pending to shipped");
        context
            .fulfilments
            .update(&shipped, FulfilmentStatus::Pending)
            .await
            .expect("first update wins");

        let mut stale = recorded.clone();
        stale
            .apply(
                FulfilmentChanges {
                    carrier: Some("DPD".to_owned()),
                    ..FulfilmentChanges::default()
                },
                fixture_timestamp(),
            )
            .expect("carrier change");
        let error = context
            .fulfilments
            .update(&stale, FulfilmentStatus::Pending)
            .await
            .expect_err("row is no longer pending");
        assert_eq!(
            error,
            FulfilmentRepositoryError::status_changed(recorded.id(), FulfilmentStatus::Pending)
        );

        let stored = FulfilmentRepository::find_by_id(&context.fulfilments, &recorded.id())
            .await
            .expect("lookup")
            .expect("fulfilment stored");
        assert_eq!(stored.status(), FulfilmentStatus::Shipped);
        assert_eq!(stored.carrier(), Some("Royal Mail"));
        assert_eq!(stored.shipped_at(), Some(fixture_timestamp()));

        let unknown = shipment(order.id(), &order, 1);
        let error = context
            .fulfilments
            .update(&unknown, FulfilmentStatus::Pending)
            .await
            .expect_err("never recorded");
        assert_eq!(error, FulfilmentRepositoryError::not_found(unknown.id()));
    });
}

//! Tests for the fulfilment tracking service.

use std::sync::Arc;

use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    FulfilmentLineRequest, FulfilmentRepositoryError, MockFulfilmentRepository,
    MockOrderRepository, OrderRepositoryError,
};
use crate::domain::{
    CustomerRefs, ErrorCode, FulfilmentError, Money, OrderDraft, OrderNumber, OrderPricing,
    OrderStatuses, PaymentStatus, Product, ProductId, ShopId, StoredFulfilment, StoredOrder,
    Variant, VariantDraft, VariantId,
};
use crate::test_support::{fixture_clock, fixture_timestamp};

fn make_service(
    fulfilments: MockFulfilmentRepository,
    orders: MockOrderRepository,
) -> FulfilmentService<MockFulfilmentRepository, MockOrderRepository> {
    FulfilmentService::new(Arc::new(fulfilments), Arc::new(orders), fixture_clock())
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
        .add_line(OrderLineId::random(), &variant, Quantity::new(5).expect("positive"))
        .expect("priced");
    Order::place(OrderDraft {
        id: OrderId::random(),
        shop_id: product.shop_id(),
        order_number: OrderNumber::generate(fixture_timestamp(), Uuid::new_v4()),
        idempotency_key: None,
        customer: CustomerRefs::default(),
        address_id: None,
        priced: pricing.finish().expect("non-empty"),
        placed_at: fixture_timestamp(),
    })
}

fn cancelled(order: &Order) -> Order {
    Order::from_parts(StoredOrder {
        id: order.id(),
        shop_id: order.shop_id(),
        order_number: order.order_number().clone(),
        idempotency_key: order.idempotency_key().clone(),
        statuses: OrderStatuses {
            status: OrderStatus::Cancelled,
            payment_status: PaymentStatus::Pending,
            fulfilment_status: FulfilmentStatus::Unspecified,
        },
        customer: order.customer(),
        address_id: order.address_id(),
        subtotal: order.subtotal(),
        total: order.total(),
        lines: order.lines().to_vec(),
        created_at: order.created_at(),
    })
}

fn pending_fulfilment(order: &Order) -> Fulfilment {
    Fulfilment::from_parts(StoredFulfilment {
        id: FulfilmentId::random(),
        order_id: order.id(),
        status: FulfilmentStatus::Pending,
        carrier: None,
        tracking_number: None,
        lines: Vec::new(),
        created_at: fixture_timestamp(),
        shipped_at: None,
        delivered_at: None,
    })
}

fn create_request(order: &Order, quantities: &[i64]) -> CreateFulfilmentRequest {
    let line_id = order.lines()[0].id;
    CreateFulfilmentRequest {
        order_id: order.id(),
        lines: quantities
            .iter()
            .map(|quantity| FulfilmentLineRequest {
                order_line_id: line_id,
                quantity: *quantity,
            })
            .collect(),
    }
}

fn orders_returning(order: Order) -> MockOrderRepository {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .returning(move |_| Ok(Some(order.clone())));
    orders
}

#[rstest]
#[tokio::test]
async fn partial_fulfilment_leaves_order_confirmed(order: Order) {
    let line_id = order.lines()[0].id;
    let mut orders = orders_returning(order.clone());
    orders.expect_update_statuses().times(0);
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments
        .expect_record_fulfilment()
        .withf(|fulfilment| {
            fulfilment.status() == FulfilmentStatus::Pending && fulfilment.lines().len() == 1
        })
        .times(1)
        .return_once(move |_| Ok(FulfilledQuantities::from([(line_id, 3)])));

    let fulfilment = make_service(fulfilments, orders)
        .create_fulfilment(create_request(&order, &[3]))
        .await
        .expect("recorded");
    assert_eq!(fulfilment.order_id(), order.id());
    assert_eq!(fulfilment.created_at(), fixture_timestamp());
}

#[rstest]
#[tokio::test]
async fn completing_fulfilment_promotes_order(order: Order) {
    let line_id = order.lines()[0].id;
    let mut orders = orders_returning(order.clone());
    orders
        .expect_update_statuses()
        .withf(|_, expected, statuses| {
            *expected == OrderStatus::Confirmed
                && statuses.status == OrderStatus::Fulfilled
                && statuses.fulfilment_status == FulfilmentStatus::Delivered
        })
        .times(1)
        .return_once(|_, _, _| Ok(true));
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments
        .expect_record_fulfilment()
        .times(1)
        .return_once(move |_| Ok(FulfilledQuantities::from([(line_id, 5)])));

    make_service(fulfilments, orders)
        .create_fulfilment(create_request(&order, &[2]))
        .await
        .expect("recorded");
}

#[rstest]
#[tokio::test]
async fn committed_fulfilment_survives_failed_promotion(order: Order) {
    let line_id = order.lines()[0].id;
    let mut orders = orders_returning(order.clone());
    orders
        .expect_update_statuses()
        .times(1)
        .return_once(|_, _, _| Err(OrderRepositoryError::connection("pool exhausted")));
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments
        .expect_record_fulfilment()
        .times(1)
        .return_once(move |_| Ok(FulfilledQuantities::from([(line_id, 5)])));

    let fulfilment = make_service(fulfilments, orders)
        .create_fulfilment(create_request(&order, &[5]))
        .await
        .expect("recorded despite promotion failure");
    assert_eq!(fulfilment.lines().len(), 1);
}

#[rstest]
#[case(&[6][..], ErrorCode::FailedPrecondition)]
#[case(&[3, 3][..], ErrorCode::FailedPrecondition)]
#[case(&[][..], ErrorCode::InvalidRequest)]
#[case(&[0][..], ErrorCode::InvalidRequest)]
#[tokio::test]
async fn invalid_requests_never_reach_the_repository(
    order: Order,
    #[case] quantities: &[i64],
    #[case] expected: ErrorCode,
) {
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments.expect_record_fulfilment().times(0);

    let error = make_service(fulfilments, orders_returning(order.clone()))
        .create_fulfilment(create_request(&order, quantities))
        .await
        .expect_err("rejected");
    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn foreign_order_line_is_invalid(order: Order) {
    let mut request = create_request(&order, &[1]);
    request.lines[0].order_line_id = OrderLineId::random();

    let error = make_service(MockFulfilmentRepository::new(), orders_returning(order))
        .create_fulfilment(request)
        .await
        .expect_err("foreign line");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn cancelled_order_cannot_be_fulfilled(order: Order) {
    let request = create_request(&order, &[1]);
    let error = make_service(MockFulfilmentRepository::new(), orders_returning(cancelled(&order)))
        .create_fulfilment(request)
        .await
        .expect_err("cancelled");
    assert_eq!(error.code(), ErrorCode::FailedPrecondition);
}

#[rstest]
#[tokio::test]
async fn concurrent_shipments_rejected_under_lock_fail_precondition(order: Order) {
    let line_id = order.lines()[0].id;
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments.expect_record_fulfilment().times(1).return_once(move |_| {
        Err(FulfilmentRepositoryError::rejected(
            FulfilmentError::QuantityExceeded {
                order_line_id: line_id,
                requested: 3,
                remaining: 2,
            },
        ))
    });

    let error = make_service(fulfilments, orders_returning(order.clone()))
        .create_fulfilment(create_request(&order, &[3]))
        .await
        .expect_err("raced");
    assert_eq!(error.code(), ErrorCode::FailedPrecondition);
    assert!(error.message().contains("remaining unfulfilled quantity 2"));
}

#[tokio::test]
async fn missing_order_is_not_found() {
    let mut orders = MockOrderRepository::new();
    orders.expect_find_by_id().times(1).return_once(|_| Ok(None));

    let error = make_service(MockFulfilmentRepository::new(), orders)
        .create_fulfilment(CreateFulfilmentRequest {
            order_id: OrderId::random(),
            lines: Vec::new(),
        })
        .await
        .expect_err("missing order");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(&[], FulfilmentField::DEFAULT_MASK.to_vec())]
#[case(&["carrier"], vec![FulfilmentField::Carrier])]
#[case(&["status", " tracking_number "], vec![FulfilmentField::Status, FulfilmentField::TrackingNumber])]
fn parses_field_masks(#[case] paths: &[&str], #[case] expected: Vec<FulfilmentField>) {
    let paths: Vec<String> = paths.iter().map(|path| (*path).to_owned()).collect();
    assert_eq!(FulfilmentField::parse_mask(&paths).expect("valid mask"), expected);
}

#[tokio::test]
async fn unknown_mask_path_is_rejected_before_reading() {
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments.expect_find_by_id().times(0);

    let error = make_service(fulfilments, MockOrderRepository::new())
        .update_fulfilment(UpdateFulfilmentRequest {
            fulfilment_id: FulfilmentId::random(),
            field_mask: vec!["shipped_at".to_owned()],
            status: None,
            carrier: None,
            tracking_number: None,
        })
        .await
        .expect_err("unknown path");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn shipping_stamps_and_tolerates_failed_recompute(order: Order) {
    let fulfilment = pending_fulfilment(&order);
    let id = fulfilment.id();
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments
        .expect_find_by_id()
        .times(1)
        .return_once(move |_| Ok(Some(fulfilment)));
    fulfilments
        .expect_update()
        .withf(|fulfilment, expected| {
            *expected == FulfilmentStatus::Pending
                && fulfilment.status() == FulfilmentStatus::Shipped
                && fulfilment.carrier() == Some("DHL")
                && fulfilment.shipped_at() == Some(fixture_timestamp())
        })
        .times(1)
        .return_once(|_, _| Ok(()));
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .times(1)
        .return_once(|_| Err(OrderRepositoryError::connection("pool exhausted")));

    let updated = make_service(fulfilments, orders)
        .update_fulfilment(UpdateFulfilmentRequest {
            fulfilment_id: id,
            field_mask: Vec::new(),
            status: Some(FulfilmentStatus::Shipped),
            carrier: Some("DHL".to_owned()),
            tracking_number: Some(String::new()),
        })
        .await
        .expect("updated despite recompute failure");
    assert_eq!(updated.status(), FulfilmentStatus::Shipped);
    assert_eq!(updated.tracking_number(), None);
}

#[rstest]
#[tokio::test]
async fn backward_move_is_failed_precondition(order: Order) {
    let mut fulfilment = pending_fulfilment(&order);
    for status in [FulfilmentStatus::Shipped, FulfilmentStatus::Delivered] {
        fulfilment
            .apply(
                FulfilmentChanges {
                    status: Some(status),
                    ..FulfilmentChanges::default()
                },
                fixture_timestamp(),
            )
            .expect("forward step");
    }
    let id = fulfilment.id();
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments
        .expect_find_by_id()
        .times(1)
        .return_once(move |_| Ok(Some(fulfilment)));
    fulfilments.expect_update().times(0);

    let error = make_service(fulfilments, MockOrderRepository::new())
        .update_fulfilment(UpdateFulfilmentRequest {
            fulfilment_id: id,
            field_mask: vec!["status".to_owned()],
            status: Some(FulfilmentStatus::Shipped),
            carrier: None,
            tracking_number: None,
        })
        .await
        .expect_err("backward");
    assert_eq!(error.code(), ErrorCode::FailedPrecondition);
}

#[rstest]
#[tokio::test]
async fn lost_status_race_is_failed_precondition(order: Order) {
    let fulfilment = pending_fulfilment(&order);
    let id = fulfilment.id();
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments
        .expect_find_by_id()
        .times(1)
        .return_once(move |_| Ok(Some(fulfilment)));
    fulfilments
        .expect_update()
        .withf(|_, expected| *expected == FulfilmentStatus::Pending)
        .times(1)
        .return_once(move |_, expected| {
            Err(FulfilmentRepositoryError::status_changed(id, expected))
        });
    fulfilments.expect_fulfilled_quantities().times(0);
    let mut orders = MockOrderRepository::new();
    orders.expect_find_by_id().times(0);

    let error = make_service(fulfilments, orders)
        .update_fulfilment(UpdateFulfilmentRequest {
            fulfilment_id: id,
            field_mask: vec!["status".to_owned()],
            status: Some(FulfilmentStatus::Shipped),
            carrier: None,
            tracking_number: None,
        })
        .await
        .expect_err("another update won");
    assert_eq!(error.code(), ErrorCode::FailedPrecondition);
}

#[rstest]
#[tokio::test]
async fn masked_out_and_blank_fields_are_ignored(order: Order) {
    let fulfilment = pending_fulfilment(&order);
    let id = fulfilment.id();
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments
        .expect_find_by_id()
        .times(1)
        .return_once(move |_| Ok(Some(fulfilment)));
    fulfilments.expect_update().times(0);
    fulfilments
        .expect_fulfilled_quantities()
        .times(1)
        .return_once(|_| Ok(FulfilledQuantities::new()));

    let updated = make_service(fulfilments, orders_returning(order))
        .update_fulfilment(UpdateFulfilmentRequest {
            fulfilment_id: id,
            field_mask: vec!["carrier".to_owned()],
            status: Some(FulfilmentStatus::Shipped),
            carrier: Some("   ".to_owned()),
            tracking_number: Some("1Z999".to_owned()),
        })
        .await
        .expect("no-op update");
    assert_eq!(updated.status(), FulfilmentStatus::Pending);
    assert_eq!(updated.carrier(), None);
    assert_eq!(updated.tracking_number(), None);
}

#[rstest]
#[tokio::test]
async fn list_requires_existing_order(order: Order) {
    let order_id = order.id();
    let mut fulfilments = MockFulfilmentRepository::new();
    fulfilments
        .expect_list_by_order()
        .withf(move |id| *id == order_id)
        .times(1)
        .return_once(|_| Ok(Vec::new()));

    let listed = make_service(fulfilments, orders_returning(order))
        .list_fulfilments(&order_id)
        .await
        .expect("listed");
    assert!(listed.is_empty());
}

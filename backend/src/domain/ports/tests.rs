use super::*;
use crate::domain::{
    FulfilmentError, FulfilmentId, FulfilmentLine, FulfilmentLineId, OrderId, OrderLineId,
    Quantity, VariantId,
};
use crate::domain::Fulfilment;
use chrono::Utc;
use rstest::rstest;

#[rstest]
fn port_error_constructors_accept_str() {
    let error = OrderRepositoryError::connection("refused");
    assert_eq!(error.to_string(), "order repository connection failed: refused");

    let error = CartRepositoryError::query("syntax");
    assert_eq!(error.to_string(), "cart repository query failed: syntax");
}

#[rstest]
fn stock_errors_name_the_variant() {
    let variant_id = VariantId::random();
    let error = VariantStockError::insufficient_stock(variant_id);
    assert_eq!(error.to_string(), format!("insufficient stock for variant {variant_id}"));
}

#[rstest]
fn rejected_fulfilment_displays_the_rule() {
    let error = FulfilmentRepositoryError::rejected(FulfilmentError::OrderCancelled);
    assert_eq!(error.to_string(), "cannot fulfil a cancelled order");
}

#[tokio::test]
async fn fixture_fulfilment_repository_sums_duplicate_lines() {
    let order_line_id = OrderLineId::random();
    let line = |quantity| FulfilmentLine {
        id: FulfilmentLineId::random(),
        order_line_id,
        quantity: Quantity::new(quantity).expect("positive quantity"),
    };
    let fulfilment = Fulfilment::pending(
        FulfilmentId::random(),
        OrderId::random(),
        vec![line(2), line(3)],
        Utc::now(),
    );

    let fulfilled = FixtureFulfilmentRepository
        .record_fulfilment(&fulfilment)
        .await
        .expect("fixture records");
    assert_eq!(fulfilled.get(&order_line_id), Some(&5));
}

#[tokio::test]
async fn fixture_stock_gateway_reports_missing_variants() {
    let variant_id = VariantId::random();
    let error = FixtureVariantStockGateway
        .decrement_stock(&variant_id, Quantity::new(1).expect("positive quantity"))
        .await
        .expect_err("no variants");
    assert_eq!(error, VariantStockError::variant_not_found(variant_id));
}

//! Translation of port errors into domain errors shared by the services.
//!
//! Connection failures surface as `service_unavailable`, query failures as
//! `internal`; domain-significant variants keep their own classification.

use serde_json::json;

use super::Error;
use super::ports::{
    CartRepositoryError, CatalogRepositoryError, FulfilmentRepositoryError, OrderRepositoryError,
    VariantStockError,
};
use super::{FulfilmentError, OrderLineId, VariantId};

pub(super) fn map_catalog_error(error: CatalogRepositoryError) -> Error {
    match error {
        CatalogRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("catalog repository unavailable: {message}"))
        }
        CatalogRepositoryError::Query { message } => {
            Error::internal(format!("catalog repository error: {message}"))
        }
        CatalogRepositoryError::DuplicateSlug { slug } => {
            Error::already_exists(format!("shop slug {slug} is already taken"))
                .with_details(json!({ "slug": slug }))
        }
        CatalogRepositoryError::DuplicateSku { sku } => {
            Error::already_exists(format!("sku {sku} already exists"))
                .with_details(json!({ "sku": sku }))
        }
    }
}

pub(super) fn map_stock_error(error: VariantStockError) -> Error {
    match error {
        VariantStockError::Connection { message } => {
            Error::service_unavailable(format!("stock gateway unavailable: {message}"))
        }
        VariantStockError::Query { message } => {
            Error::internal(format!("stock gateway error: {message}"))
        }
        VariantStockError::VariantNotFound { variant_id } => variant_not_found(variant_id),
        VariantStockError::InsufficientStock { variant_id } => insufficient_stock(variant_id),
    }
}

pub(super) fn map_cart_error(error: CartRepositoryError) -> Error {
    match error {
        CartRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("cart repository unavailable: {message}"))
        }
        CartRepositoryError::Query { message } => {
            Error::internal(format!("cart repository error: {message}"))
        }
        CartRepositoryError::CartNotFound { cart_id } => {
            Error::not_found(format!("cart {cart_id} not found"))
        }
        CartRepositoryError::NotActive { cart_id } => {
            Error::failed_precondition(format!("cart {cart_id} is not active"))
        }
        CartRepositoryError::LineNotFound { line_id } => {
            Error::not_found(format!("cart line {line_id} not found"))
        }
    }
}

pub(super) fn map_order_error(error: OrderRepositoryError) -> Error {
    match error {
        OrderRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("order repository unavailable: {message}"))
        }
        OrderRepositoryError::Query { message } => {
            Error::internal(format!("order repository error: {message}"))
        }
        OrderRepositoryError::DuplicateIdempotencyKey { key } => {
            Error::internal(format!("unexpected idempotency key conflict: {key}"))
        }
        OrderRepositoryError::InsufficientStock { variant_id } => insufficient_stock(variant_id),
        OrderRepositoryError::VariantNotFound { variant_id } => variant_not_found(variant_id),
        OrderRepositoryError::CartNotActive { cart_id } => {
            Error::failed_precondition(format!("cart {cart_id} is not active"))
        }
        OrderRepositoryError::CartChanged { cart_id } => {
            Error::failed_precondition(format!("cart {cart_id} changed during checkout"))
                .with_details(json!({ "cartId": cart_id }))
        }
        OrderRepositoryError::NotFound { order_id } => {
            Error::not_found(format!("order {order_id} not found"))
        }
        OrderRepositoryError::NotCancellable { order_id, reason } => {
            Error::failed_precondition(format!("order {order_id} cannot be cancelled: {reason}"))
        }
    }
}

pub(super) fn map_fulfilment_error(error: FulfilmentRepositoryError) -> Error {
    match error {
        FulfilmentRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("fulfilment repository unavailable: {message}"))
        }
        FulfilmentRepositoryError::Query { message } => {
            Error::internal(format!("fulfilment repository error: {message}"))
        }
        FulfilmentRepositoryError::OrderNotFound { order_id } => {
            Error::not_found(format!("order {order_id} not found"))
        }
        FulfilmentRepositoryError::NotFound { fulfilment_id } => {
            Error::not_found(format!("fulfilment {fulfilment_id} not found"))
        }
        FulfilmentRepositoryError::Rejected { reason } => fulfilment_rejected(&reason),
        FulfilmentRepositoryError::StatusChanged {
            fulfilment_id,
            expected,
        } => Error::failed_precondition(format!(
            "fulfilment {fulfilment_id} was updated concurrently; it is no longer {expected}"
        ))
        .with_details(json!({ "fulfilmentId": fulfilment_id })),
    }
}

pub(super) fn fulfilment_rejected(reason: &FulfilmentError) -> Error {
    let message = reason.to_string();
    match reason {
        FulfilmentError::EmptyLines => Error::invalid_request(message),
        FulfilmentError::UnknownOrderLine { order_line_id } => {
            Error::invalid_request(message).with_details(order_line_details(*order_line_id))
        }
        FulfilmentError::QuantityExceeded {
            order_line_id,
            requested,
            remaining,
        } => Error::failed_precondition(message).with_details(json!({
            "orderLineId": order_line_id,
            "requested": requested,
            "remaining": remaining,
        })),
        FulfilmentError::OrderCancelled | FulfilmentError::InvalidTransition { .. } => {
            Error::failed_precondition(message)
        }
    }
}

pub(super) fn insufficient_stock(variant_id: VariantId) -> Error {
    Error::failed_precondition(format!("insufficient stock for variant {variant_id}"))
        .with_details(json!({ "variantId": variant_id }))
}

pub(super) fn variant_not_found(variant_id: VariantId) -> Error {
    Error::not_found(format!("variant {variant_id} not found"))
        .with_details(json!({ "variantId": variant_id }))
}

fn order_line_details(order_line_id: OrderLineId) -> serde_json::Value {
    json!({ "orderLineId": order_line_id })
}

#[cfg(test)]
mod tests {
    //! Regression coverage for port error classification.
    use super::*;
    use crate::domain::{CartId, ErrorCode, FulfilmentId, FulfilmentStatus, OrderId};
    use rstest::rstest;

    #[rstest]
    #[case(OrderRepositoryError::connection("down"), ErrorCode::ServiceUnavailable)]
    #[case(OrderRepositoryError::query("bad sql"), ErrorCode::InternalError)]
    #[case(
        OrderRepositoryError::insufficient_stock(VariantId::random()),
        ErrorCode::FailedPrecondition
    )]
    #[case(OrderRepositoryError::not_found(OrderId::random()), ErrorCode::NotFound)]
    #[case(
        OrderRepositoryError::cart_changed(CartId::random()),
        ErrorCode::FailedPrecondition
    )]
    fn classifies_order_errors(#[case] error: OrderRepositoryError, #[case] expected: ErrorCode) {
        assert_eq!(map_order_error(error).code(), expected);
    }

    #[rstest]
    #[case(FulfilmentError::EmptyLines, ErrorCode::InvalidRequest)]
    #[case(
        FulfilmentError::UnknownOrderLine { order_line_id: OrderLineId::random() },
        ErrorCode::InvalidRequest
    )]
    #[case(FulfilmentError::OrderCancelled, ErrorCode::FailedPrecondition)]
    #[case(
        FulfilmentError::QuantityExceeded {
            order_line_id: OrderLineId::random(),
            requested: 6,
            remaining: 5,
        },
        ErrorCode::FailedPrecondition
    )]
    fn classifies_fulfilment_rejections(
        #[case] reason: FulfilmentError,
        #[case] expected: ErrorCode,
    ) {
        assert_eq!(fulfilment_rejected(&reason).code(), expected);
    }

    #[rstest]
    fn lost_status_race_is_failed_precondition() {
        let error = map_fulfilment_error(FulfilmentRepositoryError::status_changed(
            FulfilmentId::random(),
            FulfilmentStatus::Pending,
        ));
        assert_eq!(error.code(), ErrorCode::FailedPrecondition);
        assert!(error.message().contains("no longer pending"));
    }

    #[rstest]
    fn duplicate_slug_is_already_exists() {
        let error = map_catalog_error(CatalogRepositoryError::duplicate_slug("coffee-corner"));
        assert_eq!(error.code(), ErrorCode::AlreadyExists);
        assert_eq!(
            error.details().and_then(|details| details.get("slug")),
            Some(&json!("coffee-corner"))
        );
    }
}

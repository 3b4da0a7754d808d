//! Cart aggregation and checkout over the in-memory store.
use std::sync::Arc;

use async_trait::async_trait;
use commerce::domain::ports::{
    AddCartLineRequest, CartCommand, CartQuery, CartRepository, CartRepositoryError,
    CatalogCommand, CreateCartRequest, CreateOrderFromCartRequest, CreateProductRequest,
    OrderCommand, RemoveCartLineRequest,
};
use commerce::domain::{
    Cart, CartId, CartLine, CartLineId, CartStatus, CustomerRefs, ErrorCode, OrderService,
    OrderStatus, ProfileId, Quantity,
};
use commerce::test_support::InMemoryCommerceStore;
use mockable::Clock;

mod support;

use support::{Commerce, usd};

#[tokio::test]
async fn adding_the_same_variant_merges_quantities() {
    let commerce = Commerce::new();
    let (shop_id, variant) = commerce.coffee_corner(100).await;
    let cart = commerce
        .carts
        .create_cart(CreateCartRequest {
            shop_id,
            customer: CustomerRefs::default(),
        })
        .await
        .expect("cart opened");

    for quantity in [2, 3] {
        commerce
            .carts
            .add_line(AddCartLineRequest {
                cart_id: cart.id(),
                variant_id: variant.id(),
                quantity,
            })
            .await
            .expect("line added");
    }

    let cart = commerce.carts.get_cart(&cart.id()).await.expect("cart");
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(cart.lines()[0].quantity.get(), 5);
    assert_eq!(commerce.stock(&variant.id()), 100);
}

#[tokio::test]
async fn checkout_converts_the_cart_exactly_once() {
    let commerce = Commerce::new();
    let (shop_id, variant) = commerce.coffee_corner(100).await;
    let owner = ProfileId::random();
    let cart = commerce
        .carts
        .create_cart(CreateCartRequest {
            shop_id,
            customer: CustomerRefs {
                profile_id: Some(owner),
                contact_id: None,
            },
        })
        .await
        .expect("cart opened");
    commerce
        .carts
        .add_line(AddCartLineRequest {
            cart_id: cart.id(),
            variant_id: variant.id(),
            quantity: 3,
        })
        .await
        .expect("line added");

    let checkout = CreateOrderFromCartRequest {
        cart_id: cart.id(),
        customer: CustomerRefs::default(),
        address_id: None,
    };
    let order = commerce
        .orders
        .create_order_from_cart(checkout)
        .await
        .expect("checkout")
        .order;

    assert_eq!(order.status(), OrderStatus::Confirmed);
    assert_eq!(order.total(), usd(31, 500_000_000));
    assert_eq!(order.customer().profile_id, Some(owner));
    assert_eq!(commerce.stock(&variant.id()), 97);

    let converted = commerce.carts.get_cart(&cart.id()).await.expect("cart");
    assert_eq!(converted.status(), CartStatus::Converted);

    let again = commerce
        .orders
        .create_order_from_cart(checkout)
        .await
        .expect_err("cart already converted");
    assert_eq!(again.code(), ErrorCode::FailedPrecondition);
    assert_eq!(commerce.store.order_count(), 1);

    let late_add = commerce
        .carts
        .add_line(AddCartLineRequest {
            cart_id: cart.id(),
            variant_id: variant.id(),
            quantity: 1,
        })
        .await
        .expect_err("converted carts are frozen");
    assert_eq!(late_add.code(), ErrorCode::FailedPrecondition);
}

#[tokio::test]
async fn checkout_with_short_stock_keeps_the_cart_active() {
    let commerce = Commerce::new();
    let (shop_id, variant) = commerce.coffee_corner(2).await;
    let cart = commerce
        .carts
        .create_cart(CreateCartRequest {
            shop_id,
            customer: CustomerRefs::default(),
        })
        .await
        .expect("cart opened");
    commerce
        .carts
        .add_line(AddCartLineRequest {
            cart_id: cart.id(),
            variant_id: variant.id(),
            quantity: 5,
        })
        .await
        .expect("carts do not reserve stock");

    let error = commerce
        .orders
        .create_order_from_cart(CreateOrderFromCartRequest {
            cart_id: cart.id(),
            customer: CustomerRefs::default(),
            address_id: None,
        })
        .await
        .expect_err("stock is short");

    assert_eq!(error.code(), ErrorCode::FailedPrecondition);
    let cart = commerce.carts.get_cart(&cart.id()).await.expect("cart");
    assert_eq!(cart.status(), CartStatus::Active);
    assert_eq!(commerce.stock(&variant.id()), 2);
}

#[tokio::test]
async fn emptied_cart_cannot_be_checked_out() {
    let commerce = Commerce::new();
    let (shop_id, variant) = commerce.coffee_corner(10).await;
    let cart = commerce
        .carts
        .create_cart(CreateCartRequest {
            shop_id,
            customer: CustomerRefs::default(),
        })
        .await
        .expect("cart opened");
    let cart = commerce
        .carts
        .add_line(AddCartLineRequest {
            cart_id: cart.id(),
            variant_id: variant.id(),
            quantity: 1,
        })
        .await
        .expect("line added");
    let line_id = cart.lines()[0].id;

    let cart = commerce
        .carts
        .remove_line(RemoveCartLineRequest {
            cart_id: cart.id(),
            line_id,
        })
        .await
        .expect("line removed");
    assert!(cart.lines().is_empty());

    let error = commerce
        .orders
        .create_order_from_cart(CreateOrderFromCartRequest {
            cart_id: cart.id(),
            customer: CustomerRefs::default(),
            address_id: None,
        })
        .await
        .expect_err("no items");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

/// Cart adapter that adds a line straight after checkout has read the cart.
struct LateLineCarts {
    store: Arc<InMemoryCommerceStore>,
    late_line: CartLine,
}

#[async_trait]
impl CartRepository for LateLineCarts {
    async fn insert_cart(&self, cart: &Cart) -> Result<(), CartRepositoryError> {
        self.store.insert_cart(cart).await
    }

    async fn find_cart(&self, id: &CartId) -> Result<Option<Cart>, CartRepositoryError> {
        let cart = self.store.find_cart(id).await?;
        self.store.merge_line(id, &self.late_line).await?;
        Ok(cart)
    }

    async fn merge_line(
        &self,
        cart_id: &CartId,
        line: &CartLine,
    ) -> Result<CartLine, CartRepositoryError> {
        self.store.merge_line(cart_id, line).await
    }

    async fn remove_line(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
    ) -> Result<(), CartRepositoryError> {
        self.store.remove_line(cart_id, line_id).await
    }
}

#[tokio::test]
async fn line_added_during_checkout_aborts_the_conversion() {
    let commerce = Commerce::new();
    let (shop_id, beans) = commerce.coffee_corner(10).await;
    let product = commerce
        .catalog
        .create_product(CreateProductRequest {
            shop_id,
            name: "Filters".to_owned(),
        })
        .await
        .expect("product");
    let filters = commerce
        .add_variant(product.id(), "FILTER-1", usd(3, 0), 10)
        .await;
    let cart = commerce
        .carts
        .create_cart(CreateCartRequest {
            shop_id,
            customer: CustomerRefs::default(),
        })
        .await
        .expect("cart opened");
    commerce
        .carts
        .add_line(AddCartLineRequest {
            cart_id: cart.id(),
            variant_id: beans.id(),
            quantity: 2,
        })
        .await
        .expect("line added");

    let clock: Arc<dyn Clock> = commerce.clock.clone();
    let carts = Arc::new(LateLineCarts {
        store: commerce.store.clone(),
        late_line: CartLine {
            id: CartLineId::random(),
            variant_id: filters.id(),
            quantity: Quantity::new(1).expect("positive"),
        },
    });
    let orders = OrderService::new(
        commerce.store.clone(),
        commerce.store.clone(),
        carts,
        commerce.store.clone(),
        clock,
    );

    let error = orders
        .create_order_from_cart(CreateOrderFromCartRequest {
            cart_id: cart.id(),
            customer: CustomerRefs::default(),
            address_id: None,
        })
        .await
        .expect_err("cart changed under checkout");

    assert_eq!(error.code(), ErrorCode::FailedPrecondition);
    assert_eq!(commerce.store.order_count(), 0);
    assert_eq!(commerce.stock(&beans.id()), 10);
    let cart = commerce.carts.get_cart(&cart.id()).await.expect("cart");
    assert_eq!(cart.status(), CartStatus::Active);
    assert_eq!(cart.lines().len(), 2);
}

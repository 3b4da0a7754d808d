//! Shared fixtures for the commerce integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! the service wiring over the in-memory store lives here instead of being
//! repeated in every suite. The Diesel adapter suites run against embedded
//! PostgreSQL through [`pg_commerce`].

#![allow(dead_code, reason = "each suite uses a different subset of helpers")]

pub mod embedded_postgres;
pub mod pg_commerce;

use std::sync::Arc;

use commerce::domain::ports::{
    CatalogCommand, CreateOrderRequest, CreateProductRequest, CreateShopRequest,
    CreateVariantRequest, OrderLineRequest,
};
use commerce::domain::{
    CartService, CatalogService, CustomerRefs, FulfilmentService, Money, OrderService, ShopId,
    Variant, VariantId,
};
use commerce::test_support::{FixtureClock, InMemoryCommerceStore};
use mockable::Clock;

/// Order service over the in-memory store.
pub type Orders = OrderService<
    InMemoryCommerceStore,
    InMemoryCommerceStore,
    InMemoryCommerceStore,
    InMemoryCommerceStore,
>;

/// Every domain service sharing one in-memory store and fixture clock.
pub struct Commerce {
    pub store: Arc<InMemoryCommerceStore>,
    pub clock: Arc<FixtureClock>,
    pub catalog: CatalogService<InMemoryCommerceStore, InMemoryCommerceStore>,
    pub carts: CartService<InMemoryCommerceStore, InMemoryCommerceStore, InMemoryCommerceStore>,
    pub orders: Arc<Orders>,
    pub fulfilments: FulfilmentService<InMemoryCommerceStore, InMemoryCommerceStore>,
}

impl Commerce {
    /// Wire the services over a fresh store and a clock pinned to the
    /// fixture timestamp.
    pub fn new() -> Self {
        let store = Arc::new(InMemoryCommerceStore::new());
        let clock = Arc::new(FixtureClock::default());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        Self {
            catalog: CatalogService::new(store.clone(), store.clone(), dyn_clock.clone()),
            carts: CartService::new(store.clone(), store.clone(), store.clone(), dyn_clock.clone()),
            orders: Arc::new(OrderService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                dyn_clock.clone(),
            )),
            fulfilments: FulfilmentService::new(store.clone(), store.clone(), dyn_clock),
            store,
            clock,
        }
    }

    /// Open "Coffee Corner" with one `SKU-X` variant priced at 10.50 USD.
    pub async fn coffee_corner(&self, stock: i64) -> (ShopId, Variant) {
        let shop = self
            .catalog
            .create_shop(CreateShopRequest {
                name: "Coffee Corner".to_owned(),
                slug: None,
            })
            .await
            .expect("shop created");
        let product = self
            .catalog
            .create_product(CreateProductRequest {
                shop_id: shop.id(),
                name: "House Blend".to_owned(),
            })
            .await
            .expect("product created");
        let variant = self
            .add_variant(product.id(), "SKU-X", usd(10, 500_000_000), stock)
            .await;
        (shop.id(), variant)
    }

    pub async fn add_variant(
        &self,
        product_id: commerce::domain::ProductId,
        sku: &str,
        unit_price: Money,
        stock: i64,
    ) -> Variant {
        self.catalog
            .create_variant(CreateVariantRequest {
                product_id,
                sku: sku.to_owned(),
                name: format!("{sku} variant"),
                unit_price,
                stock_quantity: stock,
            })
            .await
            .expect("variant created")
    }

    pub fn stock(&self, variant_id: &VariantId) -> i64 {
        self.store.stock_of(variant_id).expect("variant exists")
    }
}

pub fn usd(units: i64, nanos: i32) -> Money {
    Money::new("USD", units, nanos).expect("valid money")
}

/// Explicit-line order request with no customer references.
pub fn order_request(
    shop_id: ShopId,
    idempotency_key: Option<&str>,
    lines: &[(VariantId, i64)],
) -> CreateOrderRequest {
    CreateOrderRequest {
        shop_id,
        customer: CustomerRefs::default(),
        address_id: None,
        idempotency_key: idempotency_key.map(str::to_owned),
        lines: lines
            .iter()
            .map(|(variant_id, quantity)| OrderLineRequest {
                variant_id: *variant_id,
                quantity: *quantity,
            })
            .collect(),
    }
}

//! Diesel adapters over a throwaway embedded PostgreSQL database.

use std::sync::Arc;

use commerce::domain::ports::{
    CatalogCommand, CreateProductRequest, CreateShopRequest, CreateVariantRequest,
};
use commerce::domain::{
    CatalogService, CustomerRefs, IdempotencyKey, Order, OrderDraft, OrderId, OrderLineId,
    OrderNumber, OrderPricing, Quantity, ShopId, Variant, VariantId,
};
use commerce::outbound::persistence::{
    DbPool, DieselCartRepository, DieselCatalogRepository, DieselFulfilmentRepository,
    DieselOrderRepository, DieselVariantStockGateway, PoolConfig,
};
use commerce::test_support::{FixtureClock, fixture_timestamp};
use mockable::Clock;
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::fixture;
use tokio::runtime::Runtime;
use uuid::Uuid;

use super::embedded_postgres::{handle_cluster_setup_failure, provision_database, shared_cluster};
use super::usd;

/// Enough connections for the concurrency cases to overlap.
const POOL_SIZE: u32 = 8;

/// Every Diesel adapter sharing one pool on a private database.
pub struct PgCommerce {
    pub runtime: Runtime,
    pub catalog: CatalogService<DieselCatalogRepository, DieselVariantStockGateway>,
    pub stock: DieselVariantStockGateway,
    pub carts: DieselCartRepository,
    pub orders: DieselOrderRepository,
    pub fulfilments: DieselFulfilmentRepository,
    _database: TemporaryDatabase,
}

impl PgCommerce {
    fn connect() -> Result<Self, String> {
        let runtime = Runtime::new().map_err(|err| err.to_string())?;
        let cluster = shared_cluster()?;
        let database = provision_database(cluster)?;
        let config = PoolConfig::new(database.url().to_string())
            .with_max_size(POOL_SIZE)
            .with_min_idle(Some(1));
        let pool = runtime
            .block_on(async { DbPool::new(config).await })
            .map_err(|err| err.to_string())?;

        let clock: Arc<dyn Clock> = Arc::new(FixtureClock::default());
        let stock = DieselVariantStockGateway::new(pool.clone());
        Ok(Self {
            runtime,
            catalog: CatalogService::new(
                Arc::new(DieselCatalogRepository::new(pool.clone())),
                Arc::new(stock.clone()),
                clock,
            ),
            stock,
            carts: DieselCartRepository::new(pool.clone()),
            orders: DieselOrderRepository::new(pool.clone()),
            fulfilments: DieselFulfilmentRepository::new(pool),
            _database: database,
        })
    }

    /// Open a shop with one variant per `(sku, stock)` pair.
    pub async fn shop_with_variants(&self, variants: &[(&str, i64)]) -> (ShopId, Vec<Variant>) {
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

        let mut created = Vec::with_capacity(variants.len());
        for (sku, stock) in variants {
            let variant = self
                .catalog
                .create_variant(CreateVariantRequest {
                    product_id: product.id(),
                    sku: (*sku).to_owned(),
                    name: format!("{sku} variant"),
                    unit_price: usd(10, 500_000_000),
                    stock_quantity: *stock,
                })
                .await
                .expect("variant created");
            created.push(variant);
        }
        (shop.id(), created)
    }

    /// Current stock of a variant.
    pub async fn stock_of(&self, variant_id: &VariantId) -> i64 {
        use commerce::domain::ports::VariantStockGateway;

        self.stock
            .find_variant(variant_id)
            .await
            .expect("variant lookup")
            .expect("variant exists")
            .stock_quantity()
    }
}

/// Fresh adapters, or `None` when the cluster is skipped.
#[fixture]
pub fn pg_commerce() -> Option<PgCommerce> {
    match PgCommerce::connect() {
        Ok(context) => Some(context),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

/// Price `lines` into a confirmed order ready for
/// [`OrderRepository::place_order`](commerce::domain::ports::OrderRepository::place_order).
pub fn priced_order(shop_id: ShopId, key: Option<&str>, lines: &[(&Variant, i64)]) -> Order {
    let mut pricing = OrderPricing::new();
    for (variant, quantity) in lines {
        let quantity = Quantity::new(*quantity).expect("positive quantity");
        pricing
            .add_line(OrderLineId::random(), variant, quantity)
            .expect("line priced");
    }
    Order::place(OrderDraft {
        id: OrderId::random(),
        shop_id,
        order_number: OrderNumber::generate(fixture_timestamp(), Uuid::new_v4()),
        idempotency_key: key.map(|key| IdempotencyKey::new(key).expect("valid key")),
        customer: CustomerRefs::default(),
        address_id: None,
        priced: pricing.finish().expect("non-empty order"),
        placed_at: fixture_timestamp(),
    })
}

//! PostgreSQL-backed order repository.
//!
//! `place_order` is the one commit point of the order engine: the header,
//! its lines, every stock decrement and the optional cart conversion share a
//! single transaction, so any failure leaves stock and carts untouched. The
//! source cart is locked first, the same lock line merges take, so the
//! lines being ordered cannot change before the cart is converted.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{OrderPage, OrderRepository, OrderRepositoryError};
use crate::domain::{
    CartId, CartStatus, IdempotencyKey, Order, OrderId, OrderStatus, OrderStatuses, ShopId,
    VariantId,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error, violates};
use super::diesel_variant_stock_gateway::{Decrement, decrement_stock_row, increment_stock_row};
use super::models::{
    NewOrderRow, OrderLineRow, OrderRow, OrderStatusUpdate, new_order_line_rows, order_from_rows,
};
use super::pool::{DbPool, PoolError};
use super::schema::{cart_lines, carts, fulfilments, order_lines, orders};

const IDEMPOTENCY_KEY_CONSTRAINT: &str = "orders_idempotency_key_key";

/// Diesel-backed implementation of the order repository port.
#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> OrderRepositoryError {
    map_basic_pool_error(error, OrderRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> OrderRepositoryError {
    map_basic_diesel_error(
        error,
        OrderRepositoryError::query,
        OrderRepositoryError::connection,
    )
}

/// Failures raised inside an order transaction.
enum TxError {
    Diesel(diesel::result::Error),
    Repository(OrderRepositoryError),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl From<OrderRepositoryError> for TxError {
    fn from(error: OrderRepositoryError) -> Self {
        Self::Repository(error)
    }
}

impl TxError {
    fn into_repository_error(self) -> OrderRepositoryError {
        match self {
            Self::Diesel(error) => map_diesel_error(error),
            Self::Repository(error) => error,
        }
    }
}

/// Total requested units per variant, in variant id order.
///
/// Rows are decremented in this order so concurrent orders lock shared
/// variants in the same sequence.
fn stock_demand(order: &Order) -> BTreeMap<Uuid, i64> {
    let mut demand = BTreeMap::new();
    for line in order.lines() {
        let entry = demand.entry(*line.variant_id.as_uuid()).or_insert(0_i64);
        *entry = entry.saturating_add(line.quantity.get());
    }
    demand
}

/// Lock an active cart and return its quantities per variant.
async fn lock_cart_demand(
    conn: &mut AsyncPgConnection,
    cart_id: CartId,
) -> Result<BTreeMap<Uuid, i64>, TxError> {
    let status: Option<String> = carts::table
        .filter(carts::id.eq(cart_id.as_uuid()))
        .select(carts::status)
        .for_update()
        .first(conn)
        .await
        .optional()?;
    if status.as_deref() != Some(CartStatus::Active.as_str()) {
        return Err(OrderRepositoryError::cart_not_active(cart_id).into());
    }

    let rows: Vec<(Uuid, i64)> = cart_lines::table
        .filter(cart_lines::cart_id.eq(cart_id.as_uuid()))
        .select((cart_lines::variant_id, cart_lines::quantity))
        .load(conn)
        .await?;
    let mut demand = BTreeMap::new();
    for (variant_id, quantity) in rows {
        let entry = demand.entry(variant_id).or_insert(0_i64);
        *entry = entry.saturating_add(quantity);
    }
    Ok(demand)
}

async fn load_lines(
    conn: &mut AsyncPgConnection,
    order_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, Vec<OrderLineRow>>> {
    let rows: Vec<OrderLineRow> = order_lines::table
        .filter(order_lines::order_id.eq_any(order_ids))
        .order((order_lines::order_id.asc(), order_lines::position.asc()))
        .select(OrderLineRow::as_select())
        .load(conn)
        .await?;
    let mut grouped: HashMap<Uuid, Vec<OrderLineRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.order_id).or_default().push(row);
    }
    Ok(grouped)
}

async fn assemble_orders(
    conn: &mut AsyncPgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, OrderRepositoryError> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut lines = load_lines(conn, &ids).await.map_err(map_diesel_error)?;
    rows.into_iter()
        .map(|row| {
            let order_lines = lines.remove(&row.id).unwrap_or_default();
            order_from_rows(row, order_lines).map_err(OrderRepositoryError::query)
        })
        .collect()
}

async fn find_one(
    conn: &mut AsyncPgConnection,
    row: Option<OrderRow>,
) -> Result<Option<Order>, OrderRepositoryError> {
    match row {
        Some(row) => Ok(assemble_orders(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

#[async_trait]
impl OrderRepository for DieselOrderRepository {
    async fn place_order(
        &self,
        order: &Order,
        source_cart: Option<CartId>,
    ) -> Result<(), OrderRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let header = NewOrderRow::from(order);
        let lines = new_order_line_rows(order).map_err(OrderRepositoryError::query)?;
        let demand = stock_demand(order);
        let key = order.idempotency_key().to_string();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                if let Some(cart_id) = source_cart {
                    if lock_cart_demand(conn, cart_id).await? != demand {
                        return Err(OrderRepositoryError::cart_changed(cart_id).into());
                    }
                }

                diesel::insert_into(orders::table)
                    .values(&header)
                    .execute(conn)
                    .await
                    .map_err(|error| {
                        if violates(&error, IDEMPOTENCY_KEY_CONSTRAINT) {
                            TxError::from(OrderRepositoryError::duplicate_idempotency_key(key))
                        } else {
                            TxError::from(error)
                        }
                    })?;
                diesel::insert_into(order_lines::table)
                    .values(&lines)
                    .execute(conn)
                    .await?;

                for (variant_id, quantity) in &demand {
                    let variant = VariantId::from_uuid(*variant_id);
                    match decrement_stock_row(conn, *variant_id, *quantity).await? {
                        Decrement::Applied(remaining) => {
                            debug!(%variant, remaining, "stock decremented");
                        }
                        Decrement::Insufficient => {
                            return Err(OrderRepositoryError::insufficient_stock(variant).into());
                        }
                        Decrement::Missing => {
                            return Err(OrderRepositoryError::variant_not_found(variant).into());
                        }
                    }
                }

                if let Some(cart_id) = source_cart {
                    diesel::update(carts::table.filter(carts::id.eq(cart_id.as_uuid())))
                        .set((
                            carts::status.eq(CartStatus::Converted.as_str()),
                            carts::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await?;
                }
                Ok::<_, TxError>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(TxError::into_repository_error)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = orders::table
            .filter(orders::id.eq(id.as_uuid()))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        find_one(&mut conn, row).await
    }

    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = orders::table
            .filter(orders::idempotency_key.eq(key.as_ref()))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        find_one(&mut conn, row).await
    }

    async fn list_by_shop(
        &self,
        shop_id: &ShopId,
        page: OrderPage,
    ) -> Result<Vec<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<OrderRow> = orders::table
            .filter(orders::shop_id.eq(shop_id.as_uuid()))
            .order((orders::created_at.desc(), orders::id.desc()))
            .limit(page.limit)
            .offset(page.offset)
            .select(OrderRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        assemble_orders(&mut conn, rows).await
    }

    async fn update_statuses(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        statuses: OrderStatuses,
    ) -> Result<bool, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(id.as_uuid()))
                .filter(orders::status.eq(expected.as_str())),
        )
        .set((
            OrderStatusUpdate::from(statuses),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        if updated > 0 {
            return Ok(true);
        }

        let exists: Option<Uuid> = orders::table
            .filter(orders::id.eq(id.as_uuid()))
            .select(orders::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        match exists {
            Some(_) => Ok(false),
            None => Err(OrderRepositoryError::not_found(*id)),
        }
    }

    async fn cancel_order(&self, id: &OrderId) -> Result<Order, OrderRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let order_id = *id;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let row: OrderRow = orders::table
                    .filter(orders::id.eq(order_id.as_uuid()))
                    .select(OrderRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| OrderRepositoryError::not_found(order_id))?;
                let order = assemble_orders(conn, vec![row])
                    .await?
                    .pop()
                    .ok_or_else(|| OrderRepositoryError::not_found(order_id))?;

                if order.status() != OrderStatus::Confirmed {
                    return Err(OrderRepositoryError::not_cancellable(
                        order_id,
                        format!("order is {}", order.status()),
                    )
                    .into());
                }
                let fulfilment_count: i64 = fulfilments::table
                    .filter(fulfilments::order_id.eq(order_id.as_uuid()))
                    .count()
                    .get_result(conn)
                    .await?;
                if fulfilment_count > 0 {
                    return Err(OrderRepositoryError::not_cancellable(
                        order_id,
                        "order has fulfilments",
                    )
                    .into());
                }

                let statuses = OrderStatuses {
                    status: OrderStatus::Cancelled,
                    ..order.statuses()
                };
                diesel::update(orders::table.filter(orders::id.eq(order_id.as_uuid())))
                    .set((
                        OrderStatusUpdate::from(statuses),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;

                for (variant_id, quantity) in stock_demand(&order) {
                    if increment_stock_row(conn, variant_id, quantity).await?.is_none() {
                        return Err(OrderRepositoryError::variant_not_found(
                            VariantId::from_uuid(variant_id),
                        )
                        .into());
                    }
                }
                Ok::<_, TxError>(order.with_statuses(statuses))
            }
            .scope_boxed()
        })
        .await
        .map_err(TxError::into_repository_error)
    }
}

#[cfg(test)]
mod tests {
    //! Unit coverage for stock demand aggregation.

    use rstest::rstest;

    use super::*;
    use crate::domain::{
        CustomerRefs, Money, OrderDraft, OrderLineId, OrderNumber, OrderPricing, Product,
        ProductId, Quantity, Variant, VariantDraft,
    };
    use crate::test_support::fixture_timestamp;

    #[rstest]
    fn duplicate_variant_lines_are_summed_in_id_order() {
        let shop_id = ShopId::random();
        let product = Product::new(ProductId::random(), shop_id, "Beans").expect("product");
        let variant = Variant::new(VariantDraft {
            id: VariantId::random(),
            product: &product,
            sku: "BEANS-1KG",
            name: "1kg",
            unit_price: Money::new("USD", 30, 0).expect("price"),
            stock_quantity: 10,
        })
        .expect("variant");

        let mut pricing = OrderPricing::new();
        for quantity in [2, 4] {
            pricing
                .add_line(
                    OrderLineId::random(),
                    &variant,
                    Quantity::new(quantity).expect("qty"),
                )
                .expect("priced");
        }
        let order = Order::place(OrderDraft {
            id: OrderId::random(),
            shop_id,
            order_number: OrderNumber::generate(fixture_timestamp(), Uuid::nil()),
            idempotency_key: None,
            customer: CustomerRefs::default(),
            address_id: None,
            priced: pricing.finish().expect("non-empty"),
            placed_at: fixture_timestamp(),
        });

        let demand = stock_demand(&order);
        assert_eq!(demand.len(), 1);
        assert_eq!(demand.get(variant.id().as_uuid()), Some(&6));
    }
}

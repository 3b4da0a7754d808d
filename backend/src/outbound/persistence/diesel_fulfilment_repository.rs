//! PostgreSQL-backed fulfilment repository.
//!
//! Recording a fulfilment locks the parent order row, so concurrent
//! shipments against one order are checked against an up-to-date view of
//! what is already fulfilled. Cancellation takes the same lock. Updates are
//! conditional on the status the caller read, so a slower writer can never
//! move a shipment backwards.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{FulfilmentRepository, FulfilmentRepositoryError};
use crate::domain::{
    FulfilledQuantities, Fulfilment, FulfilmentId, FulfilmentStatus, OrderId, OrderLineId,
    check_fulfilment,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{
    FulfilmentLineRow, FulfilmentRow, FulfilmentUpdate, NewFulfilmentRow, OrderLineRow, OrderRow,
    fulfilment_from_rows, new_fulfilment_line_rows, order_from_rows,
};
use super::pool::{DbPool, PoolError};
use super::schema::{fulfilment_lines, fulfilments, order_lines, orders};

/// Diesel-backed implementation of the fulfilment repository port.
#[derive(Clone)]
pub struct DieselFulfilmentRepository {
    pool: DbPool,
}

impl DieselFulfilmentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> FulfilmentRepositoryError {
    map_basic_pool_error(error, FulfilmentRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> FulfilmentRepositoryError {
    map_basic_diesel_error(
        error,
        FulfilmentRepositoryError::query,
        FulfilmentRepositoryError::connection,
    )
}

enum TxError {
    Diesel(diesel::result::Error),
    Repository(FulfilmentRepositoryError),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl From<FulfilmentRepositoryError> for TxError {
    fn from(error: FulfilmentRepositoryError) -> Self {
        Self::Repository(error)
    }
}

impl TxError {
    fn into_repository_error(self) -> FulfilmentRepositoryError {
        match self {
            Self::Diesel(error) => map_diesel_error(error),
            Self::Repository(error) => error,
        }
    }
}

/// Sum fulfilled units per order line across every fulfilment of an order.
async fn load_fulfilled(
    conn: &mut AsyncPgConnection,
    order_id: Uuid,
) -> QueryResult<FulfilledQuantities> {
    let rows: Vec<(Uuid, i64)> = fulfilment_lines::table
        .inner_join(fulfilments::table)
        .filter(fulfilments::order_id.eq(order_id))
        .select((fulfilment_lines::order_line_id, fulfilment_lines::quantity))
        .load(conn)
        .await?;
    let mut fulfilled = FulfilledQuantities::new();
    for (order_line_id, quantity) in rows {
        let entry = fulfilled
            .entry(OrderLineId::from_uuid(order_line_id))
            .or_insert(0);
        *entry = entry.saturating_add(quantity);
    }
    Ok(fulfilled)
}

async fn assemble_fulfilments(
    conn: &mut AsyncPgConnection,
    rows: Vec<FulfilmentRow>,
) -> Result<Vec<Fulfilment>, FulfilmentRepositoryError> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let line_rows: Vec<FulfilmentLineRow> = fulfilment_lines::table
        .filter(fulfilment_lines::fulfilment_id.eq_any(&ids))
        .order((
            fulfilment_lines::fulfilment_id.asc(),
            fulfilment_lines::position.asc(),
        ))
        .select(FulfilmentLineRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?;

    let mut grouped: HashMap<Uuid, Vec<FulfilmentLineRow>> = HashMap::new();
    for line in line_rows {
        grouped.entry(line.fulfilment_id).or_default().push(line);
    }
    rows.into_iter()
        .map(|row| {
            let lines = grouped.remove(&row.id).unwrap_or_default();
            fulfilment_from_rows(row, lines).map_err(FulfilmentRepositoryError::query)
        })
        .collect()
}

#[async_trait]
impl FulfilmentRepository for DieselFulfilmentRepository {
    async fn record_fulfilment(
        &self,
        fulfilment: &Fulfilment,
    ) -> Result<FulfilledQuantities, FulfilmentRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let order_id = fulfilment.order_id();
        let header = NewFulfilmentRow::from(fulfilment);
        let lines =
            new_fulfilment_line_rows(fulfilment).map_err(FulfilmentRepositoryError::query)?;
        let requested: Vec<_> = fulfilment
            .lines()
            .iter()
            .map(|line| (line.order_line_id, line.quantity))
            .collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let order_row: OrderRow = orders::table
                    .filter(orders::id.eq(order_id.as_uuid()))
                    .select(OrderRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| FulfilmentRepositoryError::order_not_found(order_id))?;
                let order_line_rows: Vec<OrderLineRow> = order_lines::table
                    .filter(order_lines::order_id.eq(order_id.as_uuid()))
                    .order(order_lines::position.asc())
                    .select(OrderLineRow::as_select())
                    .load(conn)
                    .await?;
                let order = order_from_rows(order_row, order_line_rows)
                    .map_err(FulfilmentRepositoryError::query)?;

                let mut fulfilled = load_fulfilled(conn, *order_id.as_uuid()).await?;
                check_fulfilment(&order, &requested, &fulfilled)
                    .map_err(FulfilmentRepositoryError::rejected)?;

                diesel::insert_into(fulfilments::table)
                    .values(&header)
                    .execute(conn)
                    .await?;
                diesel::insert_into(fulfilment_lines::table)
                    .values(&lines)
                    .execute(conn)
                    .await?;

                for (order_line_id, quantity) in &requested {
                    let entry = fulfilled.entry(*order_line_id).or_insert(0);
                    *entry = entry.saturating_add(quantity.get());
                }
                Ok::<_, TxError>(fulfilled)
            }
            .scope_boxed()
        })
        .await
        .map_err(TxError::into_repository_error)
    }

    async fn fulfilled_quantities(
        &self,
        order_id: &OrderId,
    ) -> Result<FulfilledQuantities, FulfilmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_fulfilled(&mut conn, *order_id.as_uuid())
            .await
            .map_err(map_diesel_error)
    }

    async fn find_by_id(
        &self,
        id: &FulfilmentId,
    ) -> Result<Option<Fulfilment>, FulfilmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let Some(row) = fulfilments::table
            .filter(fulfilments::id.eq(id.as_uuid()))
            .select(FulfilmentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
        else {
            return Ok(None);
        };
        Ok(assemble_fulfilments(&mut conn, vec![row]).await?.pop())
    }

    async fn list_by_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<Fulfilment>, FulfilmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<FulfilmentRow> = fulfilments::table
            .filter(fulfilments::order_id.eq(order_id.as_uuid()))
            .order((fulfilments::created_at.asc(), fulfilments::id.asc()))
            .select(FulfilmentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        assemble_fulfilments(&mut conn, rows).await
    }

    async fn update(
        &self,
        fulfilment: &Fulfilment,
        expected: FulfilmentStatus,
    ) -> Result<(), FulfilmentRepositoryError> {
        let fulfilment_uuid = *fulfilment.id().as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            fulfilments::table
                .filter(fulfilments::id.eq(fulfilment_uuid))
                .filter(fulfilments::status.eq(expected.as_str())),
        )
        .set((
            FulfilmentUpdate::from(fulfilment),
            fulfilments::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        if updated > 0 {
            return Ok(());
        }

        let exists: Option<Uuid> = fulfilments::table
            .filter(fulfilments::id.eq(fulfilment_uuid))
            .select(fulfilments::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        match exists {
            Some(_) => Err(FulfilmentRepositoryError::status_changed(
                fulfilment.id(),
                expected,
            )),
            None => Err(FulfilmentRepositoryError::not_found(fulfilment.id())),
        }
    }
}

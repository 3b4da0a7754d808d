//! PostgreSQL-backed variant stock gateway.
//!
//! Stock only ever changes through single conditional `UPDATE` statements;
//! a decrement matches zero rows instead of driving the column negative.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{VariantStockError, VariantStockGateway};
use crate::domain::{Quantity, Variant, VariantId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::VariantRow;
use super::pool::{DbPool, PoolError};
use super::schema::product_variants;

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decrement {
    /// The row was updated; carries the stock left.
    Applied(i64),
    /// Fewer units than requested were available.
    Insufficient,
    /// No variant has this id.
    Missing,
}

/// Remove `quantity` units when at least that many are available.
pub(crate) async fn decrement_stock_row(
    conn: &mut AsyncPgConnection,
    variant_id: Uuid,
    quantity: i64,
) -> QueryResult<Decrement> {
    let remaining: Option<i64> = diesel::update(
        product_variants::table
            .filter(product_variants::id.eq(variant_id))
            .filter(product_variants::stock_quantity.ge(quantity)),
    )
    .set((
        product_variants::stock_quantity.eq(product_variants::stock_quantity - quantity),
        product_variants::updated_at.eq(diesel::dsl::now),
    ))
    .returning(product_variants::stock_quantity)
    .get_result(conn)
    .await
    .optional()?;

    if let Some(remaining) = remaining {
        return Ok(Decrement::Applied(remaining));
    }
    let exists: Option<Uuid> = product_variants::table
        .filter(product_variants::id.eq(variant_id))
        .select(product_variants::id)
        .first(conn)
        .await
        .optional()?;
    Ok(if exists.is_some() {
        Decrement::Insufficient
    } else {
        Decrement::Missing
    })
}

/// Add `quantity` units, returning the new stock or `None` when the
/// variant does not exist.
pub(crate) async fn increment_stock_row(
    conn: &mut AsyncPgConnection,
    variant_id: Uuid,
    quantity: i64,
) -> QueryResult<Option<i64>> {
    diesel::update(product_variants::table.filter(product_variants::id.eq(variant_id)))
        .set((
            product_variants::stock_quantity.eq(product_variants::stock_quantity + quantity),
            product_variants::updated_at.eq(diesel::dsl::now),
        ))
        .returning(product_variants::stock_quantity)
        .get_result(conn)
        .await
        .optional()
}

/// Diesel-backed implementation of the variant stock gateway.
#[derive(Clone)]
pub struct DieselVariantStockGateway {
    pool: DbPool,
}

impl DieselVariantStockGateway {
    /// Create a new gateway with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> VariantStockError {
    map_basic_pool_error(error, VariantStockError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> VariantStockError {
    map_basic_diesel_error(error, VariantStockError::query, VariantStockError::connection)
}

#[async_trait]
impl VariantStockGateway for DieselVariantStockGateway {
    async fn find_variant(&self, id: &VariantId) -> Result<Option<Variant>, VariantStockError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<VariantRow> = product_variants::table
            .filter(product_variants::id.eq(id.as_uuid()))
            .select(VariantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Variant::try_from)
            .transpose()
            .map_err(VariantStockError::query)
    }

    async fn decrement_stock(
        &self,
        id: &VariantId,
        quantity: Quantity,
    ) -> Result<i64, VariantStockError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        match decrement_stock_row(&mut conn, *id.as_uuid(), quantity.get())
            .await
            .map_err(map_diesel_error)?
        {
            Decrement::Applied(remaining) => Ok(remaining),
            Decrement::Insufficient => Err(VariantStockError::insufficient_stock(*id)),
            Decrement::Missing => Err(VariantStockError::variant_not_found(*id)),
        }
    }

    async fn increment_stock(
        &self,
        id: &VariantId,
        quantity: Quantity,
    ) -> Result<i64, VariantStockError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        increment_stock_row(&mut conn, *id.as_uuid(), quantity.get())
            .await
            .map_err(map_diesel_error)?
            .ok_or_else(|| VariantStockError::variant_not_found(*id))
    }
}

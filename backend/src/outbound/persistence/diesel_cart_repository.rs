//! PostgreSQL-backed cart repository.
//!
//! Line merges lock the cart row so a concurrent conversion cannot slip
//! between the status check and the upsert.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{CartRepository, CartRepositoryError};
use crate::domain::{Cart, CartId, CartLine, CartLineId, CartStatus};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{CartLineRow, CartRow, NewCartLineRow, NewCartRow, cart_from_rows};
use super::pool::{DbPool, PoolError};
use super::schema::{cart_lines, carts};

/// Diesel-backed implementation of the cart repository port.
#[derive(Clone)]
pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CartRepositoryError {
    map_basic_pool_error(error, CartRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> CartRepositoryError {
    map_basic_diesel_error(
        error,
        CartRepositoryError::query,
        CartRepositoryError::connection,
    )
}

/// Failures raised inside a cart transaction.
enum TxError {
    Diesel(diesel::result::Error),
    CartNotFound,
    NotActive,
    LineNotFound,
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl TxError {
    fn into_repository_error(self, cart_id: CartId, line_id: CartLineId) -> CartRepositoryError {
        match self {
            Self::Diesel(error) => map_diesel_error(error),
            Self::CartNotFound => CartRepositoryError::cart_not_found(cart_id),
            Self::NotActive => CartRepositoryError::not_active(cart_id),
            Self::LineNotFound => CartRepositoryError::line_not_found(line_id),
        }
    }
}

/// Lock the cart row and require it to be active.
async fn lock_active_cart(conn: &mut AsyncPgConnection, cart_id: Uuid) -> Result<(), TxError> {
    let status: Option<String> = carts::table
        .filter(carts::id.eq(cart_id))
        .select(carts::status)
        .for_update()
        .first(conn)
        .await
        .optional()?;
    match status {
        None => Err(TxError::CartNotFound),
        Some(status) if status == CartStatus::Active.as_str() => Ok(()),
        Some(_) => Err(TxError::NotActive),
    }
}

async fn touch_cart(conn: &mut AsyncPgConnection, cart_id: Uuid) -> QueryResult<usize> {
    diesel::update(carts::table.filter(carts::id.eq(cart_id)))
        .set(carts::updated_at.eq(diesel::dsl::now))
        .execute(conn)
        .await
}

#[async_trait]
impl CartRepository for DieselCartRepository {
    async fn insert_cart(&self, cart: &Cart) -> Result<(), CartRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(carts::table)
            .values(NewCartRow::from(cart))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_cart(&self, id: &CartId) -> Result<Option<Cart>, CartRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let Some(row) = carts::table
            .filter(carts::id.eq(id.as_uuid()))
            .select(CartRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
        else {
            return Ok(None);
        };

        let lines: Vec<CartLineRow> = cart_lines::table
            .filter(cart_lines::cart_id.eq(id.as_uuid()))
            .order(cart_lines::seq.asc())
            .select(CartLineRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        cart_from_rows(row, lines)
            .map(Some)
            .map_err(CartRepositoryError::query)
    }

    async fn merge_line(
        &self,
        cart_id: &CartId,
        line: &CartLine,
    ) -> Result<CartLine, CartRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let cart_uuid = *cart_id.as_uuid();
        let new_line = NewCartLineRow {
            id: *line.id.as_uuid(),
            cart_id: cart_uuid,
            variant_id: *line.variant_id.as_uuid(),
            quantity: line.quantity.get(),
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let merged: CartLineRow = conn
            .transaction(|conn| {
                async move {
                    lock_active_cart(conn, cart_uuid).await?;
                    let merged = diesel::insert_into(cart_lines::table)
                        .values(&new_line)
                        .on_conflict((cart_lines::cart_id, cart_lines::variant_id))
                        .do_update()
                        .set(
                            cart_lines::quantity
                                .eq(cart_lines::quantity + excluded(cart_lines::quantity)),
                        )
                        .returning(CartLineRow::as_returning())
                        .get_result(conn)
                        .await?;
                    touch_cart(conn, cart_uuid).await?;
                    Ok::<_, TxError>(merged)
                }
                .scope_boxed()
            })
            .await
            .map_err(|error| error.into_repository_error(*cart_id, line.id))?;

        CartLine::try_from(merged).map_err(CartRepositoryError::query)
    }

    async fn remove_line(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
    ) -> Result<(), CartRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let cart_uuid = *cart_id.as_uuid();
        let line_uuid = *line_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                lock_active_cart(conn, cart_uuid).await?;
                let deleted = diesel::delete(
                    cart_lines::table
                        .filter(cart_lines::id.eq(line_uuid))
                        .filter(cart_lines::cart_id.eq(cart_uuid)),
                )
                .execute(conn)
                .await?;
                if deleted == 0 {
                    return Err(TxError::LineNotFound);
                }
                touch_cart(conn, cart_uuid).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|error| error.into_repository_error(*cart_id, *line_id))
    }
}

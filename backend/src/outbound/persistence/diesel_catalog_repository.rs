//! PostgreSQL-backed catalog repository.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CatalogRepository, CatalogRepositoryError};
use crate::domain::{Product, ProductId, Shop, ShopId, Variant};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error, violates};
use super::models::{NewShopRow, NewVariantRow, ProductRow, ShopRow};
use super::pool::{DbPool, PoolError};
use super::schema::{product_variants, products, shops};

const SHOP_SLUG_CONSTRAINT: &str = "shops_slug_key";
const VARIANT_SKU_CONSTRAINT: &str = "product_variants_sku_key";

/// Diesel-backed implementation of the catalog repository port.
#[derive(Clone)]
pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CatalogRepositoryError {
    map_basic_pool_error(error, CatalogRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> CatalogRepositoryError {
    map_basic_diesel_error(
        error,
        CatalogRepositoryError::query,
        CatalogRepositoryError::connection,
    )
}

#[async_trait]
impl CatalogRepository for DieselCatalogRepository {
    async fn insert_shop(&self, shop: &Shop) -> Result<(), CatalogRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(shops::table)
            .values(NewShopRow::from(shop))
            .execute(&mut conn)
            .await
            .map_err(|error| {
                if violates(&error, SHOP_SLUG_CONSTRAINT) {
                    CatalogRepositoryError::duplicate_slug(shop.slug().as_ref())
                } else {
                    map_diesel_error(error)
                }
            })?;
        Ok(())
    }

    async fn find_shop(&self, id: &ShopId) -> Result<Option<Shop>, CatalogRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ShopRow> = shops::table
            .filter(shops::id.eq(id.as_uuid()))
            .select(ShopRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Shop::try_from)
            .transpose()
            .map_err(CatalogRepositoryError::query)
    }

    async fn insert_product(&self, product: &Product) -> Result<(), CatalogRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = ProductRow {
            id: *product.id().as_uuid(),
            shop_id: *product.shop_id().as_uuid(),
            name: product.name().to_owned(),
        };
        diesel::insert_into(products::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_product(
        &self,
        id: &ProductId,
    ) -> Result<Option<Product>, CatalogRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProductRow> = products::table
            .filter(products::id.eq(id.as_uuid()))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(|row| {
            Product::from_parts(
                ProductId::from_uuid(row.id),
                ShopId::from_uuid(row.shop_id),
                row.name,
            )
        }))
    }

    async fn insert_variant(&self, variant: &Variant) -> Result<(), CatalogRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(product_variants::table)
            .values(NewVariantRow::from(variant))
            .execute(&mut conn)
            .await
            .map_err(|error| {
                if violates(&error, VARIANT_SKU_CONSTRAINT) {
                    CatalogRepositoryError::duplicate_sku(variant.sku())
                } else {
                    map_diesel_error(error)
                }
            })?;
        Ok(())
    }
}

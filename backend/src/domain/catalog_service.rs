//! Catalog collaborator service.
//!
//! Implements [`CatalogCommand`] and [`CatalogQuery`] over the catalog
//! repository and the stock gateway. Stock is only ever changed through the
//! gateway's atomic primitives.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;

use super::service_errors::{map_catalog_error, map_stock_error, variant_not_found};
use crate::domain::ports::{
    AdjustStockRequest, CatalogCommand, CatalogQuery, CatalogRepository, CreateProductRequest,
    CreateShopRequest, CreateVariantRequest, VariantStockGateway,
};
use crate::domain::{
    CatalogValidationError, Error, Product, ProductId, Quantity, Shop, ShopId, Variant,
    VariantDraft, VariantId,
};

/// Catalog service implementing the catalog driving ports.
#[derive(Clone)]
pub struct CatalogService<K, V> {
    catalog_repo: Arc<K>,
    stock_gateway: Arc<V>,
    clock: Arc<dyn Clock>,
}

impl<K, V> CatalogService<K, V> {
    /// Create a new service with the given adapters.
    pub fn new(catalog_repo: Arc<K>, stock_gateway: Arc<V>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog_repo,
            stock_gateway,
            clock,
        }
    }
}

fn invalid(error: CatalogValidationError) -> Error {
    Error::invalid_request(error.to_string())
}

impl<K, V> CatalogService<K, V>
where
    K: CatalogRepository,
    V: VariantStockGateway,
{
    async fn require_shop(&self, id: &ShopId) -> Result<Shop, Error> {
        self.catalog_repo
            .find_shop(id)
            .await
            .map_err(map_catalog_error)?
            .ok_or_else(|| Error::not_found(format!("shop {id} not found")))
    }

    async fn require_product(&self, id: &ProductId) -> Result<Product, Error> {
        self.catalog_repo
            .find_product(id)
            .await
            .map_err(map_catalog_error)?
            .ok_or_else(|| Error::not_found(format!("product {id} not found")))
    }

    async fn require_variant(&self, id: &VariantId) -> Result<Variant, Error> {
        self.stock_gateway
            .find_variant(id)
            .await
            .map_err(map_stock_error)?
            .ok_or_else(|| variant_not_found(*id))
    }
}

#[async_trait]
impl<K, V> CatalogCommand for CatalogService<K, V>
where
    K: CatalogRepository,
    V: VariantStockGateway,
{
    async fn create_shop(&self, request: CreateShopRequest) -> Result<Shop, Error> {
        let shop = Shop::new(
            ShopId::random(),
            &request.name,
            request.slug.as_deref(),
            self.clock.utc(),
        )
        .map_err(invalid)?;
        self.catalog_repo
            .insert_shop(&shop)
            .await
            .map_err(map_catalog_error)?;
        info!(shop_id = %shop.id(), slug = %shop.slug(), "shop created");
        Ok(shop)
    }

    async fn create_product(&self, request: CreateProductRequest) -> Result<Product, Error> {
        let shop = self.require_shop(&request.shop_id).await?;
        let product = Product::new(ProductId::random(), shop.id(), &request.name).map_err(invalid)?;
        self.catalog_repo
            .insert_product(&product)
            .await
            .map_err(map_catalog_error)?;
        Ok(product)
    }

    async fn create_variant(&self, request: CreateVariantRequest) -> Result<Variant, Error> {
        let product = self.require_product(&request.product_id).await?;
        let variant = Variant::new(VariantDraft {
            id: VariantId::random(),
            product: &product,
            sku: &request.sku,
            name: &request.name,
            unit_price: request.unit_price,
            stock_quantity: request.stock_quantity,
        })
        .map_err(invalid)?;
        self.catalog_repo
            .insert_variant(&variant)
            .await
            .map_err(map_catalog_error)?;
        info!(
            variant_id = %variant.id(),
            sku = variant.sku(),
            stock = variant.stock_quantity(),
            "variant created"
        );
        Ok(variant)
    }

    async fn adjust_stock(&self, request: AdjustStockRequest) -> Result<Variant, Error> {
        let AdjustStockRequest { variant_id, delta } = request;
        if delta == 0 {
            return Err(Error::invalid_request("stock adjustment must not be zero"));
        }
        let magnitude = delta
            .checked_abs()
            .and_then(|value| Quantity::new(value).ok())
            .ok_or_else(|| Error::invalid_request("stock adjustment is out of range"))?;

        let remaining = if delta > 0 {
            self.stock_gateway
                .increment_stock(&variant_id, magnitude)
                .await
        } else {
            self.stock_gateway
                .decrement_stock(&variant_id, magnitude)
                .await
        }
        .map_err(map_stock_error)?;
        info!(variant_id = %variant_id, delta, remaining, "stock adjusted");

        self.require_variant(&variant_id).await
    }
}

#[async_trait]
impl<K, V> CatalogQuery for CatalogService<K, V>
where
    K: CatalogRepository,
    V: VariantStockGateway,
{
    async fn get_shop(&self, id: &ShopId) -> Result<Shop, Error> {
        self.require_shop(id).await
    }

    async fn get_variant(&self, id: &VariantId) -> Result<Variant, Error> {
        self.require_variant(id).await
    }
}

#[cfg(test)]
#[path = "catalog_service_tests.rs"]
mod tests;

//! Driving ports for the catalog collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Error, Money, Product, ProductId, Shop, ShopId, Variant, VariantId};

/// Request to open a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShopRequest {
    /// Display name.
    pub name: String,
    /// Explicit slug; derived from the name when absent.
    pub slug: Option<String>,
}

/// Request to add a product to a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    /// Owning shop.
    pub shop_id: ShopId,
    /// Display name.
    pub name: String,
}

/// Request to add a purchasable variant to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariantRequest {
    /// Owning product.
    pub product_id: ProductId,
    /// Stock keeping unit.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub unit_price: Money,
    /// Initial stock.
    pub stock_quantity: i64,
}

/// Request to move a variant's stock through the atomic primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    /// Adjusted variant.
    pub variant_id: VariantId,
    /// Signed change; positive restocks, negative withdraws.
    pub delta: i64,
}

/// Catalog mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogCommand: Send + Sync {
    /// Open a shop with a unique slug.
    async fn create_shop(&self, request: CreateShopRequest) -> Result<Shop, Error>;

    /// Add a product to an existing shop.
    async fn create_product(&self, request: CreateProductRequest) -> Result<Product, Error>;

    /// Add a variant with a unique SKU to an existing product.
    async fn create_variant(&self, request: CreateVariantRequest) -> Result<Variant, Error>;

    /// Restock or withdraw stock, returning the refreshed variant.
    async fn adjust_stock(&self, request: AdjustStockRequest) -> Result<Variant, Error>;
}

/// Catalog reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    /// Fetch a shop.
    async fn get_shop(&self, id: &ShopId) -> Result<Shop, Error>;

    /// Fetch a variant with its visible stock.
    async fn get_variant(&self, id: &VariantId) -> Result<Variant, Error>;
}

//! Catalog collaborator entities: shops, products, and variants.
//!
//! The order engine only needs a narrow view of the catalog: which shop a
//! variant belongs to, its SKU and name for snapshotting, its unit price,
//! and its currently visible stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Money, MoneyError, ProductId, ShopId, ShopSlug, SlugValidationError, VariantId};

/// Maximum length of display names and SKUs.
pub const MAX_NAME_LEN: usize = 255;

/// Validation errors for catalog entities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogValidationError {
    /// A required name was blank.
    #[error("{field} is required")]
    Blank {
        /// Offending field.
        field: &'static str,
    },
    /// A name exceeded [`MAX_NAME_LEN`].
    #[error("{field} must be at most {MAX_NAME_LEN} characters")]
    TooLong {
        /// Offending field.
        field: &'static str,
    },
    /// The slug was invalid.
    #[error(transparent)]
    Slug(#[from] SlugValidationError),
    /// The price was negative.
    #[error("price must not be negative")]
    NegativePrice,
    /// The price was malformed.
    #[error(transparent)]
    Money(#[from] MoneyError),
    /// Initial stock was negative.
    #[error("stock quantity must not be negative, got {value}")]
    NegativeStock {
        /// Rejected stock value.
        value: i64,
    },
}

fn required_text(value: &str, field: &'static str) -> Result<String, CatalogValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogValidationError::Blank { field });
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(CatalogValidationError::TooLong { field });
    }
    Ok(trimmed.to_owned())
}

/// A storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    id: ShopId,
    name: String,
    slug: ShopSlug,
    created_at: DateTime<Utc>,
}

impl Shop {
    /// Validate a new shop. A missing slug is derived from the name.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use commerce::domain::{Shop, ShopId};
    ///
    /// let shop = Shop::new(ShopId::random(), "Coffee Corner", None, Utc::now())
    ///     .expect("valid shop");
    /// assert_eq!(shop.slug().as_ref(), "coffee-corner");
    /// ```
    pub fn new(
        id: ShopId,
        name: &str,
        slug: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CatalogValidationError> {
        let name = required_text(name, "shop name")?;
        let slug = match slug.map(str::trim).filter(|value| !value.is_empty()) {
            Some(explicit) => ShopSlug::new(explicit)?,
            None => ShopSlug::derive_from_name(&name)?,
        };
        Ok(Self {
            id,
            name,
            slug,
            created_at,
        })
    }

    /// Rehydrate a shop from storage without re-validating.
    pub fn from_parts(id: ShopId, name: String, slug: ShopSlug, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            slug,
            created_at,
        }
    }

    /// Shop identifier.
    pub fn id(&self) -> ShopId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique slug.
    pub fn slug(&self) -> &ShopSlug {
        &self.slug
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A catalog product grouping variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    shop_id: ShopId,
    name: String,
}

impl Product {
    /// Validate a new product.
    pub fn new(id: ProductId, shop_id: ShopId, name: &str) -> Result<Self, CatalogValidationError> {
        Ok(Self {
            id,
            shop_id,
            name: required_text(name, "product name")?,
        })
    }

    /// Rehydrate a product from storage.
    pub fn from_parts(id: ProductId, shop_id: ShopId, name: String) -> Self {
        Self { id, shop_id, name }
    }

    /// Product identifier.
    pub fn id(&self) -> ProductId {
        self.id
    }

    /// Owning shop.
    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Input for [`Variant::new`].
#[derive(Debug, Clone)]
pub struct VariantDraft<'a> {
    /// New variant identifier.
    pub id: VariantId,
    /// Product the variant belongs to.
    pub product: &'a Product,
    /// Stock keeping unit; unique across the catalog.
    pub sku: &'a str,
    /// Display name.
    pub name: &'a str,
    /// Unit price.
    pub unit_price: Money,
    /// Initial stock.
    pub stock_quantity: i64,
}

/// A purchasable variant: the unit of pricing and inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    id: VariantId,
    product_id: ProductId,
    shop_id: ShopId,
    sku: String,
    name: String,
    unit_price: Money,
    stock_quantity: i64,
}

impl Variant {
    /// Validate a new variant.
    pub fn new(draft: VariantDraft<'_>) -> Result<Self, CatalogValidationError> {
        if draft.unit_price.is_negative() {
            return Err(CatalogValidationError::NegativePrice);
        }
        if draft.stock_quantity < 0 {
            return Err(CatalogValidationError::NegativeStock {
                value: draft.stock_quantity,
            });
        }
        Ok(Self {
            id: draft.id,
            product_id: draft.product.id(),
            shop_id: draft.product.shop_id(),
            sku: required_text(draft.sku, "sku")?,
            name: required_text(draft.name, "variant name")?,
            unit_price: draft.unit_price,
            stock_quantity: draft.stock_quantity,
        })
    }

    /// Rehydrate a variant from storage.
    pub fn from_parts(
        id: VariantId,
        product_id: ProductId,
        shop_id: ShopId,
        sku: String,
        name: String,
        unit_price: Money,
        stock_quantity: i64,
    ) -> Self {
        Self {
            id,
            product_id,
            shop_id,
            sku,
            name,
            unit_price,
            stock_quantity,
        }
    }

    /// Copy of this variant carrying a new stock level.
    #[must_use]
    pub fn with_stock_quantity(mut self, stock_quantity: i64) -> Self {
        self.stock_quantity = stock_quantity;
        self
    }

    /// Variant identifier.
    pub fn id(&self) -> VariantId {
        self.id
    }

    /// Owning product.
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Shop of the owning product.
    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    /// Stock keeping unit.
    pub fn sku(&self) -> &str {
        &self.sku
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current unit price.
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Stock visible at read time. Advisory only; the atomic decrement is
    /// authoritative.
    pub fn stock_quantity(&self) -> i64 {
        self.stock_quantity
    }
}

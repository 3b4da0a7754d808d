//! Port for shop, product, and variant persistence.
//!
//! The catalog is a collaborator of the order engine: it stores and
//! retrieves entities but carries no business rules beyond uniqueness of
//! shop slugs and variant SKUs, which adapters report through dedicated
//! error variants.

use async_trait::async_trait;

use crate::domain::{Product, ProductId, Shop, ShopId, Variant};

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalog repository adapters.
    pub enum CatalogRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "catalog repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "catalog repository query failed: {message}",
        /// Another shop already uses the slug.
        DuplicateSlug { slug: String } =>
            "shop slug {slug} is already taken",
        /// Another variant already uses the SKU.
        DuplicateSku { sku: String } =>
            "sku {sku} already exists",
    }
}

/// Port for catalog storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist a new shop.
    async fn insert_shop(&self, shop: &Shop) -> Result<(), CatalogRepositoryError>;

    /// Fetch a shop by identifier.
    async fn find_shop(&self, id: &ShopId) -> Result<Option<Shop>, CatalogRepositoryError>;

    /// Persist a new product.
    async fn insert_product(&self, product: &Product) -> Result<(), CatalogRepositoryError>;

    /// Fetch a product by identifier.
    async fn find_product(&self, id: &ProductId)
    -> Result<Option<Product>, CatalogRepositoryError>;

    /// Persist a new variant with its initial stock.
    async fn insert_variant(&self, variant: &Variant) -> Result<(), CatalogRepositoryError>;
}

/// Fixture implementation that stores nothing and finds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCatalogRepository;

#[async_trait]
impl CatalogRepository for FixtureCatalogRepository {
    async fn insert_shop(&self, _shop: &Shop) -> Result<(), CatalogRepositoryError> {
        Ok(())
    }

    async fn find_shop(&self, _id: &ShopId) -> Result<Option<Shop>, CatalogRepositoryError> {
        Ok(None)
    }

    async fn insert_product(&self, _product: &Product) -> Result<(), CatalogRepositoryError> {
        Ok(())
    }

    async fn find_product(
        &self,
        _id: &ProductId,
    ) -> Result<Option<Product>, CatalogRepositoryError> {
        Ok(None)
    }

    async fn insert_variant(&self, _variant: &Variant) -> Result<(), CatalogRepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn fixture_finds_nothing() {
        let repo = FixtureCatalogRepository;
        assert!(
            repo.find_shop(&ShopId::random())
                .await
                .expect("fixture lookup")
                .is_none()
        );
    }

    #[rstest]
    fn duplicate_slug_names_the_slug() {
        let error = CatalogRepositoryError::duplicate_slug("coffee-corner");
        assert_eq!(error.to_string(), "shop slug coffee-corner is already taken");
    }
}

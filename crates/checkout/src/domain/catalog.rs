//! Catalog lookup collaborator.
//!
//! Product administration is owned by the catalog subsystem; checkout only
//! ever asks for the current name and price of a product.

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<CatalogProduct>;

/// Catalog view of a product, as priced right now.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub price: u64,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    NotFound,
}

#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Retrieve a single product with its current price.
    async fn get_product(&self, product: ProductUuid) -> Result<CatalogProduct, CatalogError>;
}

/// Catalog backed by process memory, used for wiring and tests until the
/// catalog subsystem's client replaces it.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<FxHashMap<ProductUuid, CatalogProduct>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product listing.
    pub async fn upsert_product(&self, product: CatalogProduct) {
        self.products.write().await.insert(product.uuid, product);
    }

    /// Delist a product.
    pub async fn remove_product(&self, product: ProductUuid) {
        self.products.write().await.remove(&product);
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn get_product(&self, product: ProductUuid) -> Result<CatalogProduct, CatalogError> {
        self.products
            .read()
            .await
            .get(&product)
            .cloned()
            .ok_or(CatalogError::NotFound)
    }
}

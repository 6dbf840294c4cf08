//! Carts service errors.

use thiserror::Error;

use crate::domain::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("quantity out of range")]
    InvalidQuantity,

    #[error("product not found")]
    ProductNotFound,

    #[error("cart line not found")]
    LineNotFound,

    #[error("cart was modified concurrently")]
    VersionConflict,
}

impl From<CatalogError> for CartsServiceError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound => Self::ProductNotFound,
        }
    }
}

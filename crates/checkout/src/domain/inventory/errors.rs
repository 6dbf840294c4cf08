//! Inventory ledger errors.

use thiserror::Error;

use crate::domain::catalog::ProductUuid;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("insufficient stock for product {product}")]
    InsufficientStock { product: ProductUuid },

    #[error("unknown reservation")]
    UnknownReservation,
}

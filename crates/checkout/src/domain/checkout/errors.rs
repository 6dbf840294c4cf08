//! Checkout errors.

use thiserror::Error;

use crate::{
    domain::{catalog::ProductUuid, inventory::InventoryError, orders::OrdersError},
    gateway::PaymentGatewayError,
};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("insufficient stock for product {product}")]
    InsufficientStock { product: ProductUuid },

    #[error("product no longer available")]
    ProductNotFound { product: ProductUuid },

    #[error("cart was modified during checkout; retry")]
    CartConflict,

    #[error("payment initiation failed; retry checkout")]
    PaymentInitiation(#[source] PaymentGatewayError),

    #[error("order not found")]
    OrderNotFound,

    #[error("order can no longer be cancelled")]
    NotCancellable,

    #[error("order was updated concurrently; retry")]
    ConcurrentUpdateConflict,

    #[error("order storage error")]
    Orders(#[source] OrdersError),

    #[error("inventory error")]
    Inventory(#[source] InventoryError),
}

impl From<InventoryError> for CheckoutError {
    fn from(error: InventoryError) -> Self {
        match error {
            InventoryError::InsufficientStock { product } => Self::InsufficientStock { product },
            InventoryError::UnknownReservation => Self::Inventory(error),
        }
    }
}

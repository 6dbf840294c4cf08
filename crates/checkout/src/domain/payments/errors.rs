//! Payments service errors.

use thiserror::Error;

use crate::{
    domain::{inventory::InventoryError, orders::OrdersError},
    gateway::PaymentIntentId,
    webhook::WebhookError,
};

#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error("invalid webhook signature")]
    InvalidSignature(#[source] WebhookError),

    #[error("malformed event payload")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("no order for payment intent {intent}")]
    UnknownOrder { intent: PaymentIntentId },

    #[error("order settlement conflicted; retry")]
    ConcurrentUpdateConflict,

    #[error("order storage error")]
    Orders(#[source] OrdersError),

    #[error("inventory error")]
    Inventory(#[source] InventoryError),
}

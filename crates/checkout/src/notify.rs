//! Settlement notifications.
//!
//! Dispatched best-effort after an order settles; a notification that fails
//! to send never rolls back the transition it reports.

use async_trait::async_trait;
use mockall::automock;
use tracing::info;

use crate::domain::orders::models::Order;

#[automock]
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Tell the customer-facing side that an order moved to a new status.
    async fn order_status_changed(&self, order: &Order);
}

/// Notifier that only records the transition in the log stream. The real
/// dispatcher (mail, push) lives outside this crate.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OrderNotifier for LogNotifier {
    async fn order_status_changed(&self, order: &Order) {
        info!(
            order = %order.uuid,
            customer = %order.customer,
            status = ?order.status,
            total = order.total,
            "order status changed"
        );
    }
}

//! Payment reconciliation service.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use tracing::{debug, info, warn};

use crate::{
    domain::{
        inventory::InventoryLedger,
        orders::{Order, OrderRepository, OrderStatus, errors::OrdersError},
        payments::{
            errors::PaymentsError,
            models::{PaymentEvent, PaymentOutcome, ProcessedEventLog, ProviderEventPayload},
        },
    },
    notify::OrderNotifier,
    webhook::WebhookVerifier,
};

/// Maps provider callbacks idempotently onto order state and finalizes the
/// inventory held for the order.
///
/// The order status write is the commit point: reservations are only
/// committed or released after the compare-and-swap write is accepted, and a
/// conflicting write triggers a bounded re-read of the order rather than a
/// blind retry of the same version.
pub struct PaymentReconciler {
    orders: Arc<OrderRepository>,
    ledger: Arc<InventoryLedger>,
    verifier: WebhookVerifier,
    notifier: Arc<dyn OrderNotifier>,
    processed: ProcessedEventLog,
    attempts: u32,
}

impl PaymentReconciler {
    #[must_use]
    pub fn new(
        orders: Arc<OrderRepository>,
        ledger: Arc<InventoryLedger>,
        verifier: WebhookVerifier,
        notifier: Arc<dyn OrderNotifier>,
        attempts: u32,
    ) -> Self {
        Self {
            orders,
            ledger,
            verifier,
            notifier,
            processed: ProcessedEventLog::new(),
            attempts,
        }
    }

    /// Commit or release the order's reservations to match its settled
    /// status.
    async fn finalize_inventory(&self, order: &Order) -> Result<(), PaymentsError> {
        for token in &order.reservations {
            let result = match order.status {
                OrderStatus::Paid => self.ledger.commit(*token).await,
                _ => self.ledger.release(*token).await,
            };

            if let Err(error) = result {
                warn!(order = %order.uuid, %error, "failed to finalize reservation");

                return Err(PaymentsError::Inventory(error));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl PaymentsService for PaymentReconciler {
    #[tracing::instrument(skip_all)]
    async fn handle_provider_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), PaymentsError> {
        if let Err(error) = self.verifier.verify(payload, signature) {
            warn!("rejected provider callback with bad signature");

            return Err(PaymentsError::InvalidSignature(error));
        }

        let parsed: ProviderEventPayload =
            serde_json::from_slice(payload).map_err(PaymentsError::InvalidPayload)?;

        self.apply_event(parsed.into()).await
    }

    async fn apply_event(&self, event: PaymentEvent) -> Result<(), PaymentsError> {
        if self.processed.is_processed(&event.provider_event_id).await {
            debug!(event = %event.provider_event_id, "skipping already-processed event");

            return Ok(());
        }

        for _ in 0..self.attempts {
            let Some(mut order) = self.orders.find_by_intent(&event.intent).await else {
                warn!(
                    event = %event.provider_event_id,
                    intent = %event.intent,
                    "payment event for unknown order"
                );

                return Err(PaymentsError::UnknownOrder {
                    intent: event.intent,
                });
            };

            if !order.status.awaiting_payment() {
                // Late or duplicate callback after settlement; never re-apply.
                self.processed.record(&event).await;
                debug!(
                    event = %event.provider_event_id,
                    order = %order.uuid,
                    status = ?order.status,
                    "ignoring callback for settled order"
                );

                return Ok(());
            }

            if event.amount != order.total {
                warn!(
                    order = %order.uuid,
                    expected = order.total,
                    reported = event.amount,
                    "payment amount differs from order total"
                );
            }

            let next = match event.outcome {
                PaymentOutcome::Success => OrderStatus::Paid,
                PaymentOutcome::Failure => OrderStatus::PaymentFailed,
            };

            order.transition(next).map_err(PaymentsError::Orders)?;

            match self.orders.update(&order).await {
                Ok(updated) => {
                    self.processed.record(&event).await;
                    self.finalize_inventory(&updated).await?;
                    self.notifier.order_status_changed(&updated).await;

                    info!(
                        event = %event.provider_event_id,
                        order = %updated.uuid,
                        status = ?updated.status,
                        "payment event settled order"
                    );

                    return Ok(());
                }
                Err(OrdersError::VersionConflict) => {
                    debug!(
                        event = %event.provider_event_id,
                        order = %order.uuid,
                        "order moved while reconciling; re-reading"
                    );
                }
                Err(error) => return Err(PaymentsError::Orders(error)),
            }
        }

        Err(PaymentsError::ConcurrentUpdateConflict)
    }
}

#[automock]
#[async_trait]
pub trait PaymentsService: Send + Sync {
    /// Webhook entry point: verify the provider signature over the raw body,
    /// then apply the event. Fails closed on a bad signature with no state
    /// change.
    async fn handle_provider_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), PaymentsError>;

    /// Apply an authenticated payment event to its order, at most once per
    /// `provider_event_id`.
    async fn apply_event(&self, event: PaymentEvent) -> Result<(), PaymentsError>;
}

//! Background reclamation of abandoned checkouts.

use std::{sync::Arc, time::Duration};

use jiff::{SignedDuration, Timestamp};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    domain::{
        inventory::InventoryLedger,
        orders::{OrderRepository, OrderStatus, errors::OrdersError},
    },
    notify::OrderNotifier,
};

/// Periodically cancels orders that sat in `PendingPayment` past the
/// reservation TTL and returns their stock, so an abandoned checkout can
/// never lock inventory for good.
///
/// Orders are cancelled first (compare-and-swap, so a settlement racing the
/// sweep wins), then their holds released; a late success callback therefore
/// finds a terminal order instead of committing stock that was already given
/// back. Holds that never got as far as an order are released directly.
pub struct ReservationSweeper {
    ledger: Arc<InventoryLedger>,
    orders: Arc<OrderRepository>,
    notifier: Arc<dyn OrderNotifier>,
    reservation_ttl: SignedDuration,
    interval: Duration,
}

impl ReservationSweeper {
    #[must_use]
    pub fn new(
        ledger: Arc<InventoryLedger>,
        orders: Arc<OrderRepository>,
        notifier: Arc<dyn OrderNotifier>,
        reservation_ttl: SignedDuration,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            orders,
            notifier,
            reservation_ttl,
            interval,
        }
    }

    /// Run the sweep on its interval until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.sweep(Timestamp::now()).await;
            }
        })
    }

    /// One sweep pass, as of `now`.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self, now: Timestamp) {
        let cutoff = now
            .checked_sub(self.reservation_ttl)
            .unwrap_or(Timestamp::MIN);

        for order in self.orders.list_pending_older_than(cutoff).await {
            let mut candidate = order;

            if candidate.transition(OrderStatus::Cancelled).is_err() {
                continue;
            }

            match self.orders.update(&candidate).await {
                Ok(updated) => {
                    for token in &updated.reservations {
                        if let Err(error) = self.ledger.release(*token).await {
                            warn!(
                                order = %updated.uuid,
                                reservation = %token,
                                %error,
                                "failed to release reservation for expired order"
                            );
                        }
                    }

                    self.notifier.order_status_changed(&updated).await;

                    info!(order = %updated.uuid, "cancelled expired pending order");
                }
                Err(OrdersError::VersionConflict) => {
                    debug!(order = %candidate.uuid, "order settled while sweeping; skipping");
                }
                Err(error) => {
                    warn!(order = %candidate.uuid, %error, "failed to cancel expired order");
                }
            }
        }

        let stray = self.ledger.release_expired(now).await;

        if !stray.is_empty() {
            info!(count = stray.len(), "released expired reservations");
        }
    }
}

//! App Context

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    config::CheckoutConfig,
    domain::{
        carts::{CartStore, CartsService},
        catalog::CatalogService,
        checkout::{CheckoutCoordinator, CheckoutService},
        inventory::{InventoryLedger, ReservationSweeper},
        orders::OrderRepository,
        payments::{PaymentReconciler, PaymentsService},
    },
    gateway::PaymentGateway,
    notify::OrderNotifier,
    webhook::{WebhookSecret, WebhookVerifier},
};

/// Wired-up checkout core, handed to the transport layer.
#[derive(Clone)]
pub struct AppContext {
    pub carts: Arc<dyn CartsService>,
    pub checkout: Arc<dyn CheckoutService>,
    pub payments: Arc<dyn PaymentsService>,
    pub ledger: Arc<InventoryLedger>,
    pub orders: Arc<OrderRepository>,
    notifier: Arc<dyn OrderNotifier>,
    config: CheckoutConfig,
}

impl AppContext {
    /// Build the checkout core around the given collaborators.
    #[must_use]
    pub fn new(
        config: CheckoutConfig,
        catalog: Arc<dyn CatalogService>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn OrderNotifier>,
        webhook_secret: WebhookSecret,
    ) -> Self {
        let carts = Arc::new(CartStore::new(catalog.clone(), config.line_quantity_cap));
        let ledger = Arc::new(InventoryLedger::new(config.reservation_ttl));
        let orders = Arc::new(OrderRepository::new());

        let checkout = Arc::new(CheckoutCoordinator::new(
            carts.clone(),
            catalog,
            ledger.clone(),
            orders.clone(),
            gateway,
            notifier.clone(),
            config.clone(),
        ));

        let payments = Arc::new(PaymentReconciler::new(
            orders.clone(),
            ledger.clone(),
            WebhookVerifier::new(webhook_secret),
            notifier.clone(),
            config.reconcile_attempts,
        ));

        Self {
            carts,
            checkout,
            payments,
            ledger,
            orders,
            notifier,
            config,
        }
    }

    /// Start the background sweep that reclaims abandoned reservations.
    pub fn spawn_reservation_sweeper(&self) -> JoinHandle<()> {
        ReservationSweeper::new(
            self.ledger.clone(),
            self.orders.clone(),
            self.notifier.clone(),
            self.config.reservation_ttl,
            self.config.sweep_interval,
        )
        .spawn()
    }
}

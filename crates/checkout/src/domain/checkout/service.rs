//! Checkout coordination service.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::{
    config::CheckoutConfig,
    domain::{
        carts::{CartsService, CartsServiceError, models::{Cart, CustomerUuid}},
        catalog::{CatalogError, CatalogService},
        checkout::errors::CheckoutError,
        inventory::{InventoryLedger, models::ReservationUuid},
        orders::{
            Order, OrderRepository, OrderStatus,
            errors::OrdersError,
            models::{OrderLine, OrderUuid},
        },
    },
    gateway::{IntentRequest, PaymentGateway},
    notify::OrderNotifier,
};

/// Converts a cart into a pending order: reserves stock all-or-nothing,
/// freezes catalog prices into order lines, creates the payment intent, and
/// clears the cart.
///
/// The cart's version counter is the checkout's optimistic guard: it is read
/// once up front, re-checked before the order is persisted, and checked again
/// by the final cart clear, so stock is never reserved for lines the
/// customer already removed.
pub struct CheckoutCoordinator {
    carts: Arc<dyn CartsService>,
    catalog: Arc<dyn CatalogService>,
    ledger: Arc<InventoryLedger>,
    orders: Arc<OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn OrderNotifier>,
    config: CheckoutConfig,
}

impl CheckoutCoordinator {
    #[must_use]
    pub fn new(
        carts: Arc<dyn CartsService>,
        catalog: Arc<dyn CatalogService>,
        ledger: Arc<InventoryLedger>,
        orders: Arc<OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn OrderNotifier>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            carts,
            catalog,
            ledger,
            orders,
            gateway,
            notifier,
            config,
        }
    }

    async fn release_all(&self, tokens: &[ReservationUuid]) {
        for token in tokens {
            if let Err(error) = self.ledger.release(*token).await {
                warn!(reservation = %token, %error, "failed to roll back reservation");
            }
        }
    }

    /// Pick up an order an earlier checkout attempt left without a payment
    /// intent (or without its cart clear), instead of reserving stock twice.
    async fn resume(&self, order: Order, cart: &Cart) -> Result<Order, CheckoutError> {
        debug!(order = %order.uuid, "resuming pending order for unchanged cart");

        if order.payment.is_some() {
            self.clear_cart(order.customer, cart.version).await;

            return Ok(order);
        }

        self.initiate_payment(order, cart).await
    }

    /// Create the payment intent, store it on the order, then clear the cart.
    /// A gateway failure leaves the order pending with its reservations
    /// intact; the caller may retry checkout, which resumes here.
    async fn initiate_payment(&self, mut order: Order, cart: &Cart) -> Result<Order, CheckoutError> {
        let intent = self
            .gateway
            .create_intent(IntentRequest {
                amount: order.total,
                currency: self.config.currency.clone(),
                order: order.uuid,
            })
            .await
            .map_err(|error| {
                warn!(order = %order.uuid, %error, "payment intent creation failed");

                CheckoutError::PaymentInitiation(error)
            })?;

        order.payment = Some(intent);

        let order = match self.orders.update(&order).await {
            Ok(updated) => updated,
            // The sweep or a cancellation moved the order while the provider
            // call was in flight.
            Err(OrdersError::VersionConflict) => return Err(CheckoutError::ConcurrentUpdateConflict),
            Err(error) => return Err(CheckoutError::Orders(error)),
        };

        self.clear_cart(order.customer, cart.version).await;

        info!(
            order = %order.uuid,
            customer = %order.customer,
            total = order.total,
            "checkout created pending order"
        );

        Ok(order)
    }

    /// Version-checked cart clear; a concurrent customer mutation wins and
    /// keeps the cart.
    async fn clear_cart(&self, customer: CustomerUuid, expected_version: u64) {
        if let Err(CartsServiceError::VersionConflict) =
            self.carts.clear(customer, expected_version).await
        {
            debug!(%customer, "cart changed during checkout; leaving it in place");
        }
    }

    async fn owned_order(
        &self,
        order: OrderUuid,
        customer: CustomerUuid,
    ) -> Result<Order, CheckoutError> {
        let order = self
            .orders
            .get(order)
            .await
            .map_err(|_| CheckoutError::OrderNotFound)?;

        // A foreign order reads as absent rather than forbidden.
        if order.customer != customer {
            return Err(CheckoutError::OrderNotFound);
        }

        Ok(order)
    }
}

#[async_trait]
impl CheckoutService for CheckoutCoordinator {
    #[tracing::instrument(skip(self))]
    async fn checkout(&self, customer: CustomerUuid) -> Result<Order, CheckoutError> {
        let cart = self.carts.get_cart(customer).await;

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        if let Some(existing) = self
            .orders
            .find_pending_snapshot(customer, cart.version)
            .await
        {
            return self.resume(existing, &cart).await;
        }

        // Reserve every line, all-or-nothing.
        let mut tokens: SmallVec<[ReservationUuid; 4]> = SmallVec::new();

        for line in &cart.lines {
            match self.ledger.reserve(line.product, line.quantity).await {
                Ok(token) => tokens.push(token),
                Err(error) => {
                    self.release_all(&tokens).await;

                    return Err(error.into());
                }
            }
        }

        // Freeze current catalog prices, not the cart's snapshots.
        let mut lines = Vec::with_capacity(cart.lines.len());

        for line in &cart.lines {
            match self.catalog.get_product(line.product).await {
                Ok(listing) => lines.push(OrderLine {
                    product: line.product,
                    name: listing.name,
                    quantity: line.quantity,
                    unit_price: listing.price,
                }),
                Err(CatalogError::NotFound) => {
                    self.release_all(&tokens).await;

                    return Err(CheckoutError::ProductNotFound {
                        product: line.product,
                    });
                }
            }
        }

        // The cart must not have moved while stock was being reserved.
        if self.carts.get_cart(customer).await.version != cart.version {
            self.release_all(&tokens).await;

            return Err(CheckoutError::CartConflict);
        }

        let order = Order::new(customer, lines, tokens.clone(), cart.version);

        let order = match self.orders.insert(order).await {
            Ok(order) => order,
            Err(error) => {
                self.release_all(&tokens).await;

                return Err(CheckoutError::Orders(error));
            }
        };

        self.initiate_payment(order, &cart).await
    }

    async fn get_order(
        &self,
        order: OrderUuid,
        customer: CustomerUuid,
    ) -> Result<Order, CheckoutError> {
        self.owned_order(order, customer).await
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_order(
        &self,
        order: OrderUuid,
        customer: CustomerUuid,
    ) -> Result<Order, CheckoutError> {
        for _ in 0..self.config.reconcile_attempts {
            let mut candidate = self.owned_order(order, customer).await?;

            if !candidate.status.awaiting_payment() {
                return Err(CheckoutError::NotCancellable);
            }

            candidate
                .transition(OrderStatus::Cancelled)
                .map_err(CheckoutError::Orders)?;

            match self.orders.update(&candidate).await {
                Ok(updated) => {
                    self.release_all(&updated.reservations).await;
                    self.notifier.order_status_changed(&updated).await;

                    info!(order = %updated.uuid, "order cancelled by customer");

                    return Ok(updated);
                }
                Err(OrdersError::VersionConflict) => {
                    debug!(order = %candidate.uuid, "order moved while cancelling; re-reading");
                }
                Err(error) => return Err(CheckoutError::Orders(error)),
            }
        }

        Err(CheckoutError::ConcurrentUpdateConflict)
    }
}

#[automock]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Convert the customer's cart into a pending order with a payment
    /// intent attached, reserving stock for every line.
    async fn checkout(&self, customer: CustomerUuid) -> Result<Order, CheckoutError>;

    /// Fetch one of the customer's own orders.
    async fn get_order(
        &self,
        order: OrderUuid,
        customer: CustomerUuid,
    ) -> Result<Order, CheckoutError>;

    /// Cancel an order that is still awaiting payment, releasing its stock.
    async fn cancel_order(
        &self,
        order: OrderUuid,
        customer: CustomerUuid,
    ) -> Result<Order, CheckoutError>;
}

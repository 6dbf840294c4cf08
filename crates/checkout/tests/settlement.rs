//! End-to-end settlement scenarios over the public surface: checkout,
//! provider callbacks, cancellation, and the reservation sweep.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use testresult::TestResult;

use karno_checkout::{
    config::CheckoutConfig,
    context::AppContext,
    domain::{
        carts::{CartsService, models::CustomerUuid},
        catalog::{CatalogProduct, InMemoryCatalog, ProductUuid},
        checkout::{CheckoutError, CheckoutService},
        inventory::{ReservationSweeper, models::StockLevel},
        orders::{Order, OrderStatus},
        payments::PaymentsService,
    },
    gateway::{IntentRequest, PaymentGateway, PaymentGatewayError, PaymentIntent},
    notify::LogNotifier,
    webhook::{WebhookSecret, WebhookVerifier},
};

/// Gateway double issuing sequential intents in memory.
#[derive(Debug, Default)]
struct SequentialGateway {
    counter: AtomicU64,
}

#[async_trait]
impl PaymentGateway for SequentialGateway {
    async fn create_intent(
        &self,
        _request: IntentRequest,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(PaymentIntent {
            intent: format!("pi_{n}").into(),
            client_secret: format!("cs_{n}"),
        })
    }
}

struct Harness {
    app: AppContext,
    catalog: Arc<InMemoryCatalog>,
    verifier: WebhookVerifier,
    config: CheckoutConfig,
}

impl Harness {
    fn new() -> Self {
        let config = CheckoutConfig::default();
        let catalog = Arc::new(InMemoryCatalog::new());
        let secret = WebhookSecret::generate();
        let verifier = WebhookVerifier::new(secret.clone());

        let app = AppContext::new(
            config.clone(),
            catalog.clone(),
            Arc::new(SequentialGateway::default()),
            Arc::new(LogNotifier::new()),
            secret,
        );

        Self {
            app,
            catalog,
            verifier,
            config,
        }
    }

    async fn seed_product(&self, name: &str, price: u64, stock: u64) -> ProductUuid {
        let uuid = ProductUuid::generate();

        self.catalog
            .upsert_product(CatalogProduct {
                uuid,
                name: name.to_string(),
                price,
            })
            .await;

        self.app.ledger.set_stock(uuid, stock).await;

        uuid
    }

    fn signed_event(
        &self,
        event_id: &str,
        order: &Order,
        outcome: &str,
    ) -> TestResult<(Vec<u8>, String)> {
        let intent = &order
            .payment
            .as_ref()
            .expect("order should have a payment intent")
            .intent;

        let payload = serde_json::to_vec(&serde_json::json!({
            "id": event_id,
            "payment_intent": intent.as_str(),
            "outcome": outcome,
            "amount": order.total,
        }))?;

        let signature = self.verifier.sign(&payload)?;

        Ok((payload, signature))
    }

    fn sweeper(&self) -> ReservationSweeper {
        ReservationSweeper::new(
            self.app.ledger.clone(),
            self.app.orders.clone(),
            Arc::new(LogNotifier::new()),
            self.config.reservation_ttl,
            self.config.sweep_interval,
        )
    }

    async fn level(&self, product: ProductUuid) -> StockLevel {
        self.app
            .ledger
            .stock_level(product)
            .await
            .expect("stock record should exist")
    }
}

#[tokio::test]
async fn sold_out_line_fails_the_whole_checkout() -> TestResult {
    let harness = Harness::new();
    let plentiful = harness.seed_product("Oil Filter", 12_00, 2).await;
    let sold_out = harness.seed_product("Rare Badge", 99_00, 0).await;
    let customer = CustomerUuid::generate();

    harness.app.carts.add_line(customer, plentiful, 2).await?;
    harness.app.carts.add_line(customer, sold_out, 1).await?;

    let result = harness.app.checkout.checkout(customer).await;
    assert!(
        matches!(
            result,
            Err(CheckoutError::InsufficientStock { product }) if product == sold_out
        ),
        "expected InsufficientStock naming the sold-out product, got {result:?}"
    );

    assert_eq!(harness.level(plentiful).await, StockLevel {
        available: 2,
        reserved: 0,
    });

    let cart = harness.app.carts.get_cart(customer).await;
    assert_eq!(cart.lines.len(), 2, "cart is left untouched");

    Ok(())
}

#[tokio::test]
async fn successful_payment_commits_the_sale() -> TestResult {
    let harness = Harness::new();
    let product = harness.seed_product("Ignition Coil", 35_00, 10).await;
    let customer = CustomerUuid::generate();

    harness.app.carts.add_line(customer, product, 3).await?;
    let order = harness.app.checkout.checkout(customer).await?;

    assert_eq!(harness.level(product).await, StockLevel {
        available: 7,
        reserved: 3,
    });

    let (payload, signature) = harness.signed_event("evt_1", &order, "succeeded")?;
    harness
        .app
        .payments
        .handle_provider_event(&payload, &signature)
        .await?;

    let paid = harness
        .app
        .checkout
        .get_order(order.uuid, customer)
        .await?;
    assert_eq!(paid.status, OrderStatus::Paid);

    // Available keeps its post-reservation value; the hold itself is gone.
    assert_eq!(harness.level(product).await, StockLevel {
        available: 7,
        reserved: 0,
    });

    Ok(())
}

#[tokio::test]
async fn failed_payment_returns_the_stock() -> TestResult {
    let harness = Harness::new();
    let product = harness.seed_product("Door Handle", 22_00, 10).await;
    let customer = CustomerUuid::generate();

    harness.app.carts.add_line(customer, product, 3).await?;
    let order = harness.app.checkout.checkout(customer).await?;

    let (payload, signature) = harness.signed_event("evt_1", &order, "failed")?;
    harness
        .app
        .payments
        .handle_provider_event(&payload, &signature)
        .await?;

    let failed = harness
        .app
        .checkout
        .get_order(order.uuid, customer)
        .await?;
    assert_eq!(failed.status, OrderStatus::PaymentFailed);

    assert_eq!(harness.level(product).await, StockLevel {
        available: 10,
        reserved: 0,
    });

    Ok(())
}

#[tokio::test]
async fn duplicate_callbacks_settle_exactly_once() -> TestResult {
    let harness = Harness::new();
    let product = harness.seed_product("Side Mirror", 48_00, 4).await;
    let customer = CustomerUuid::generate();

    harness.app.carts.add_line(customer, product, 1).await?;
    let order = harness.app.checkout.checkout(customer).await?;

    let (payload, signature) = harness.signed_event("evt_1", &order, "succeeded")?;

    for _ in 0..5 {
        harness
            .app
            .payments
            .handle_provider_event(&payload, &signature)
            .await?;
    }

    assert_eq!(
        harness.level(product).await,
        StockLevel {
            available: 3,
            reserved: 0,
        },
        "five deliveries must deduct like one"
    );

    Ok(())
}

#[tokio::test]
async fn abandoned_checkout_is_reclaimed_by_the_sweep() -> TestResult {
    let harness = Harness::new();
    let product = harness.seed_product("Fog Light", 28_00, 2).await;
    let abandoner = CustomerUuid::generate();
    let buyer = CustomerUuid::generate();

    harness.app.carts.add_line(abandoner, product, 2).await?;
    let order = harness.app.checkout.checkout(abandoner).await?;

    // The buyer cannot have the units while they are held.
    harness.app.carts.add_line(buyer, product, 2).await?;
    assert!(
        harness.app.checkout.checkout(buyer).await.is_err(),
        "held stock must not be sellable"
    );

    // Twenty minutes on, the sweep reclaims the abandoned order.
    let later = Timestamp::now()
        .checked_add(SignedDuration::from_mins(20))
        .expect("timestamp arithmetic");
    harness.sweeper().sweep(later).await;

    let swept = harness
        .app
        .checkout
        .get_order(order.uuid, abandoner)
        .await?;
    assert_eq!(swept.status, OrderStatus::Cancelled);

    let reclaimed = harness.app.checkout.checkout(buyer).await?;
    assert_eq!(reclaimed.status, OrderStatus::PendingPayment);

    assert_eq!(harness.level(product).await, StockLevel {
        available: 0,
        reserved: 2,
    });

    Ok(())
}

#[tokio::test]
async fn cancelling_frees_stock_for_the_next_buyer() -> TestResult {
    let harness = Harness::new();
    let product = harness.seed_product("Tail Light", 31_00, 1).await;
    let first = CustomerUuid::generate();
    let second = CustomerUuid::generate();

    harness.app.carts.add_line(first, product, 1).await?;
    let order = harness.app.checkout.checkout(first).await?;

    harness
        .app
        .checkout
        .cancel_order(order.uuid, first)
        .await?;

    harness.app.carts.add_line(second, product, 1).await?;
    let taken = harness.app.checkout.checkout(second).await?;

    assert_eq!(taken.status, OrderStatus::PendingPayment);

    Ok(())
}

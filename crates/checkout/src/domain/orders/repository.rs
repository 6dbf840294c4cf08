//! Orders Repository

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::{
    domain::{
        carts::models::CustomerUuid,
        orders::{
            errors::OrdersError,
            models::{Order, OrderUuid},
        },
    },
    gateway::PaymentIntentId,
};

/// Durable store of order aggregates, keyed by order id.
///
/// Writes are compare-and-swap on the aggregate's `version`: `update` takes
/// an order carrying the version it was read at and rejects the write if the
/// stored version has advanced since.
#[derive(Debug, Default)]
pub struct OrderRepository {
    orders: RwLock<FxHashMap<OrderUuid, Order>>,
}

impl OrderRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a freshly created order.
    ///
    /// # Errors
    ///
    /// Returns [`OrdersError::AlreadyExists`] when the id is taken.
    pub async fn insert(&self, order: Order) -> Result<Order, OrdersError> {
        let mut orders = self.orders.write().await;

        if orders.contains_key(&order.uuid) {
            return Err(OrdersError::AlreadyExists);
        }

        orders.insert(order.uuid, order.clone());

        Ok(order)
    }

    /// Fetch an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`OrdersError::NotFound`] when no such order exists.
    pub async fn get(&self, order: OrderUuid) -> Result<Order, OrdersError> {
        self.orders
            .read()
            .await
            .get(&order)
            .cloned()
            .ok_or(OrdersError::NotFound)
    }

    /// Fetch the order a payment intent belongs to.
    pub async fn find_by_intent(&self, intent: &PaymentIntentId) -> Option<Order> {
        self.orders
            .read()
            .await
            .values()
            .find(|order| {
                order
                    .payment
                    .as_ref()
                    .is_some_and(|payment| &payment.intent == intent)
            })
            .cloned()
    }

    /// Fetch the not-yet-settled order created from exactly this cart
    /// snapshot, if one exists. Used to resume an interrupted checkout
    /// instead of reserving stock twice.
    pub async fn find_pending_snapshot(
        &self,
        customer: CustomerUuid,
        cart_version: u64,
    ) -> Option<Order> {
        self.orders
            .read()
            .await
            .values()
            .find(|order| {
                order.status.awaiting_payment()
                    && order.customer == customer
                    && order.cart_version == cart_version
            })
            .cloned()
    }

    /// All orders still awaiting payment that were created at `cutoff` or
    /// earlier. Input for the reservation sweep.
    pub async fn list_pending_older_than(&self, cutoff: Timestamp) -> Vec<Order> {
        self.orders
            .read()
            .await
            .values()
            .filter(|order| order.status.awaiting_payment() && order.created_at <= cutoff)
            .cloned()
            .collect()
    }

    /// Write back a mutated order, compare-and-swap on its version.
    ///
    /// # Errors
    ///
    /// Returns [`OrdersError::VersionConflict`] when the stored aggregate has
    /// moved past the version `order` was read at.
    pub async fn update(&self, order: &Order) -> Result<Order, OrdersError> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&order.uuid).ok_or(OrdersError::NotFound)?;

        if stored.version != order.version {
            return Err(OrdersError::VersionConflict);
        }

        let mut updated = order.clone();
        updated.version += 1;
        updated.updated_at = Timestamp::now();

        *stored = updated.clone();

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use smallvec::SmallVec;
    use testresult::TestResult;

    use crate::domain::{catalog::ProductUuid, orders::models::{OrderLine, OrderStatus}};

    use super::*;

    fn order(customer: CustomerUuid, cart_version: u64) -> Order {
        Order::new(
            customer,
            vec![OrderLine {
                product: ProductUuid::generate(),
                name: "Cabin Filter".to_string(),
                quantity: 1,
                unit_price: 18_00,
            }],
            SmallVec::new(),
            cart_version,
        )
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() -> TestResult {
        let repository = OrderRepository::new();
        let order = order(CustomerUuid::generate(), 1);
        let uuid = order.uuid;

        repository.insert(order).await?;

        let stored = repository.get(uuid).await?;
        assert_eq!(stored.uuid, uuid);
        assert_eq!(stored.version, 0);

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() -> TestResult {
        let repository = OrderRepository::new();
        let order = order(CustomerUuid::generate(), 1);

        repository.insert(order.clone()).await?;
        let result = repository.insert(order).await;

        assert!(
            matches!(result, Err(OrdersError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_advances_version() -> TestResult {
        let repository = OrderRepository::new();
        let mut order = repository
            .insert(order(CustomerUuid::generate(), 1))
            .await?;

        order.transition(OrderStatus::Paid)?;
        let updated = repository.update(&order).await?;

        assert_eq!(updated.version, 1);
        assert_eq!(repository.get(order.uuid).await?.status, OrderStatus::Paid);

        Ok(())
    }

    #[tokio::test]
    async fn stale_update_is_rejected() -> TestResult {
        let repository = OrderRepository::new();
        let order = repository
            .insert(order(CustomerUuid::generate(), 1))
            .await?;

        // Two readers at version 0; the second write must lose.
        let mut first = order.clone();
        let mut second = order;

        first.transition(OrderStatus::Paid)?;
        repository.update(&first).await?;

        second.transition(OrderStatus::PaymentFailed)?;
        let result = repository.update(&second).await;

        assert!(
            matches!(result, Err(OrdersError::VersionConflict)),
            "expected VersionConflict, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn find_by_intent_matches_only_the_owner() -> TestResult {
        let repository = OrderRepository::new();
        let mut order = repository
            .insert(order(CustomerUuid::generate(), 1))
            .await?;

        order.payment = Some(crate::gateway::PaymentIntent {
            intent: PaymentIntentId::from("pi_123"),
            client_secret: "cs_123".to_string(),
        });
        let order = repository.update(&order).await?;

        let found = repository
            .find_by_intent(&PaymentIntentId::from("pi_123"))
            .await
            .expect("order should be found by intent");
        assert_eq!(found.uuid, order.uuid);

        assert!(
            repository
                .find_by_intent(&PaymentIntentId::from("pi_999"))
                .await
                .is_none(),
            "unknown intent must not match"
        );

        Ok(())
    }

    #[tokio::test]
    async fn pending_snapshot_lookup_ignores_settled_orders() -> TestResult {
        let repository = OrderRepository::new();
        let customer = CustomerUuid::generate();

        let mut settled = repository.insert(order(customer, 3)).await?;
        settled.transition(OrderStatus::Cancelled)?;
        repository.update(&settled).await?;

        assert!(
            repository.find_pending_snapshot(customer, 3).await.is_none(),
            "cancelled order must not be resumed"
        );

        let pending = repository.insert(order(customer, 4)).await?;
        let found = repository
            .find_pending_snapshot(customer, 4)
            .await
            .expect("pending order should be found");
        assert_eq!(found.uuid, pending.uuid);

        Ok(())
    }

    #[tokio::test]
    async fn list_pending_older_than_filters_by_age_and_status() -> TestResult {
        let repository = OrderRepository::new();
        let pending = repository
            .insert(order(CustomerUuid::generate(), 1))
            .await?;

        let mut paid = repository
            .insert(order(CustomerUuid::generate(), 1))
            .await?;
        paid.transition(OrderStatus::Paid)?;
        repository.update(&paid).await?;

        let now = Timestamp::now();

        let stale = repository.list_pending_older_than(now).await;
        assert_eq!(stale.len(), 1, "only the pending order qualifies");
        assert_eq!(stale[0].uuid, pending.uuid);

        let before_everything = repository
            .list_pending_older_than(Timestamp::MIN)
            .await;
        assert!(
            before_everything.is_empty(),
            "nothing predates the epoch floor"
        );

        Ok(())
    }
}

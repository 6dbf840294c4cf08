//! Order Models

use jiff::Timestamp;
use smallvec::SmallVec;

use crate::{
    domain::{
        carts::models::CustomerUuid, catalog::ProductUuid, inventory::models::ReservationUuid,
        orders::errors::OrdersError,
    },
    gateway::PaymentIntent,
    uuids::TypedUuid,
};

/// Order UUID
pub type OrderUuid = TypedUuid<Order>;

/// Order status machine.
///
/// `PendingPayment` may settle to `Paid`, `PaymentFailed`, or `Cancelled`;
/// `Paid` may move on to `Fulfilling` or `Refunded`. Everything else is
/// terminal from the settlement perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    PaymentFailed,
    Cancelled,
    Fulfilling,
    Refunded,
}

impl OrderStatus {
    #[must_use]
    pub fn may_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::PendingPayment,
                Self::Paid | Self::PaymentFailed | Self::Cancelled
            ) | (Self::Paid, Self::Fulfilling | Self::Refunded)
        )
    }

    #[must_use]
    pub fn awaiting_payment(self) -> bool {
        self == Self::PendingPayment
    }
}

/// Immutable snapshot of one purchased line; name and price are frozen at
/// checkout so later catalog edits cannot change what was sold.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product: ProductUuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: u64,
}

/// Order aggregate.
#[derive(Debug, Clone)]
pub struct Order {
    pub uuid: OrderUuid,
    pub customer: CustomerUuid,
    pub lines: Vec<OrderLine>,
    pub total: u64,
    pub status: OrderStatus,
    pub payment: Option<PaymentIntent>,
    pub reservations: SmallVec<[ReservationUuid; 4]>,
    pub cart_version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: u64,
}

impl Order {
    #[must_use]
    pub fn new(
        customer: CustomerUuid,
        lines: Vec<OrderLine>,
        reservations: SmallVec<[ReservationUuid; 4]>,
        cart_version: u64,
    ) -> Self {
        let total = lines
            .iter()
            .map(|line| u64::from(line.quantity) * line.unit_price)
            .sum();
        let now = Timestamp::now();

        Self {
            uuid: OrderUuid::generate(),
            customer,
            lines,
            total,
            status: OrderStatus::PendingPayment,
            payment: None,
            reservations,
            cart_version,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Move the order to `next` if the status machine allows it.
    ///
    /// # Errors
    ///
    /// Returns [`OrdersError::InvalidTransition`] for any edge the machine
    /// does not have.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrdersError> {
        if !self.status.may_transition_to(next) {
            return Err(OrdersError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(
            CustomerUuid::generate(),
            vec![OrderLine {
                product: ProductUuid::generate(),
                name: "Spark Plug".to_string(),
                quantity: 4,
                unit_price: 6_25,
            }],
            SmallVec::new(),
            1,
        )
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        assert_eq!(order().total, 25_00);
    }

    #[test]
    fn pending_settles_to_paid() {
        let mut order = order();

        order
            .transition(OrderStatus::Paid)
            .expect("pending may settle to paid");

        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[test]
    fn paid_never_becomes_failed() {
        let mut order = order();
        order.transition(OrderStatus::Paid).expect("legal edge");

        let result = order.transition(OrderStatus::PaymentFailed);

        assert!(
            matches!(result, Err(OrdersError::InvalidTransition { .. })),
            "expected InvalidTransition, got {result:?}"
        );
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[test]
    fn cancelled_is_terminal() {
        let mut order = order();
        order.transition(OrderStatus::Cancelled).expect("legal edge");

        for next in [
            OrderStatus::Paid,
            OrderStatus::PaymentFailed,
            OrderStatus::Fulfilling,
            OrderStatus::Refunded,
        ] {
            assert!(
                order.transition(next).is_err(),
                "cancelled order must not move to {next:?}"
            );
        }
    }

    #[test]
    fn paid_may_move_to_fulfilling() {
        let mut order = order();
        order.transition(OrderStatus::Paid).expect("legal edge");

        order
            .transition(OrderStatus::Fulfilling)
            .expect("paid may move to fulfilling");

        assert_eq!(order.status, OrderStatus::Fulfilling);
    }
}

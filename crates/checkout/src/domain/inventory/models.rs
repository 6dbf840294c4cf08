//! Inventory Models

use jiff::Timestamp;

use crate::{domain::catalog::ProductUuid, uuids::TypedUuid};

/// Reservation UUID
pub type ReservationUuid = TypedUuid<Reservation>;

/// Stock counters for one product.
///
/// `available + reserved` equals total stock at all times; every ledger
/// operation preserves that sum except `commit`, which converts reserved
/// stock into a permanent deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StockLevel {
    pub available: u64,
    pub reserved: u64,
}

/// A temporary hold on stock for one checkout line, pending the payment
/// outcome.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub uuid: ReservationUuid,
    pub product: ProductUuid,
    pub quantity: u32,
    pub state: ReservationState,
    pub held_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    Held,
    Committed,
    Released,
}

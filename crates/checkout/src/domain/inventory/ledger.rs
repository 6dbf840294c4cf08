//! Authoritative per-product stock ledger.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::domain::{
    catalog::ProductUuid,
    inventory::{
        errors::InventoryError,
        models::{Reservation, ReservationState, ReservationUuid, StockLevel},
    },
};

/// Per-product stock counters plus the reservation book.
///
/// Reserve is a check-and-decrement under the product's own lock, so
/// concurrent checkouts can never oversell. Commit and release flip the
/// reservation's state before touching stock, which makes both idempotent:
/// a token that already settled is a no-op, never an error.
pub struct InventoryLedger {
    stock: RwLock<FxHashMap<ProductUuid, Arc<Mutex<StockLevel>>>>,
    reservations: Mutex<FxHashMap<ReservationUuid, Reservation>>,
    reservation_ttl: SignedDuration,
}

impl InventoryLedger {
    #[must_use]
    pub fn new(reservation_ttl: SignedDuration) -> Self {
        Self {
            stock: RwLock::new(FxHashMap::default()),
            reservations: Mutex::new(FxHashMap::default()),
            reservation_ttl,
        }
    }

    /// Set the available quantity for a product, creating the record if it
    /// does not exist. Reserved stock is left untouched.
    pub async fn set_stock(&self, product: ProductUuid, available: u64) {
        let mut stock = self.stock.write().await;

        match stock.get(&product) {
            Some(level) => level.lock().await.available = available,
            None => {
                stock.insert(
                    product,
                    Arc::new(Mutex::new(StockLevel {
                        available,
                        reserved: 0,
                    })),
                );
            }
        }
    }

    /// Current counters for a product, if it has a stock record.
    pub async fn stock_level(&self, product: ProductUuid) -> Option<StockLevel> {
        let level = self.stock.read().await.get(&product).cloned()?;
        let level = level.lock().await;

        Some(*level)
    }

    /// Atomically move `quantity` units from available to reserved.
    ///
    /// A product without a stock record reserves as zero stock.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InsufficientStock`] when fewer than
    /// `quantity` units are available.
    pub async fn reserve(
        &self,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<ReservationUuid, InventoryError> {
        let Some(level) = self.stock.read().await.get(&product).cloned() else {
            return Err(InventoryError::InsufficientStock { product });
        };

        {
            let mut level = level.lock().await;

            if level.available < u64::from(quantity) {
                return Err(InventoryError::InsufficientStock { product });
            }

            level.available -= u64::from(quantity);
            level.reserved += u64::from(quantity);
        }

        let reservation = Reservation {
            uuid: ReservationUuid::generate(),
            product,
            quantity,
            state: ReservationState::Held,
            held_at: Timestamp::now(),
        };
        let uuid = reservation.uuid;

        self.reservations.lock().await.insert(uuid, reservation);

        Ok(uuid)
    }

    /// Convert a held reservation into a permanent deduction.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::UnknownReservation`] for a token this ledger
    /// never issued.
    pub async fn commit(&self, token: ReservationUuid) -> Result<(), InventoryError> {
        let settled = self.settle(token, ReservationState::Committed).await?;

        if let Some((product, quantity)) = settled {
            if let Some(level) = self.stock.read().await.get(&product).cloned() {
                level.lock().await.reserved -= u64::from(quantity);
            }
        }

        Ok(())
    }

    /// Return a held reservation's units to available stock.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::UnknownReservation`] for a token this ledger
    /// never issued.
    pub async fn release(&self, token: ReservationUuid) -> Result<(), InventoryError> {
        let settled = self.settle(token, ReservationState::Released).await?;

        if let Some((product, quantity)) = settled {
            if let Some(level) = self.stock.read().await.get(&product).cloned() {
                let mut level = level.lock().await;

                level.reserved -= u64::from(quantity);
                level.available += u64::from(quantity);
            }
        }

        Ok(())
    }

    /// Release every reservation still held at `now - reservation_ttl` or
    /// earlier, returning the reclaimed tokens.
    pub async fn release_expired(&self, now: Timestamp) -> Vec<ReservationUuid> {
        let cutoff = now
            .checked_sub(self.reservation_ttl)
            .unwrap_or(Timestamp::MIN);

        let mut expired = Vec::new();

        {
            let mut reservations = self.reservations.lock().await;

            for reservation in reservations.values_mut() {
                if reservation.state == ReservationState::Held && reservation.held_at <= cutoff {
                    reservation.state = ReservationState::Released;
                    expired.push((reservation.uuid, reservation.product, reservation.quantity));
                }
            }
        }

        for (uuid, product, quantity) in &expired {
            if let Some(level) = self.stock.read().await.get(product).cloned() {
                let mut level = level.lock().await;

                level.reserved -= u64::from(*quantity);
                level.available += u64::from(*quantity);
            }

            debug!(reservation = %uuid, product = %product, "released expired reservation");
        }

        expired.into_iter().map(|(uuid, _, _)| uuid).collect()
    }

    /// Flip a held reservation to `target`, returning what must be applied to
    /// stock. Already-settled reservations settle to `None`.
    async fn settle(
        &self,
        token: ReservationUuid,
        target: ReservationState,
    ) -> Result<Option<(ProductUuid, u32)>, InventoryError> {
        let mut reservations = self.reservations.lock().await;
        let reservation = reservations
            .get_mut(&token)
            .ok_or(InventoryError::UnknownReservation)?;

        if reservation.state != ReservationState::Held {
            return Ok(None);
        }

        reservation.state = target;

        Ok(Some((reservation.product, reservation.quantity)))
    }
}

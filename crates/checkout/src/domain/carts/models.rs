//! Cart Models

use jiff::Timestamp;

use crate::{domain::catalog::ProductUuid, uuids::TypedUuid};

/// Customer marker for typed UUIDs. Accounts are owned by the auth
/// subsystem; checkout only ever sees an authenticated customer id.
#[derive(Debug)]
pub struct Customer;

/// Customer UUID
pub type CustomerUuid = TypedUuid<Customer>;

/// A customer's in-progress cart. The version counter advances on every
/// mutation and is what checkout uses to detect concurrent edits.
#[derive(Debug, Clone)]
pub struct Cart {
    pub customer: CustomerUuid,
    pub lines: Vec<CartLine>,
    pub version: u64,
    pub updated_at: Timestamp,
}

impl Cart {
    #[must_use]
    pub fn empty(customer: CustomerUuid) -> Self {
        Self {
            customer,
            lines: Vec::new(),
            version: 0,
            updated_at: Timestamp::now(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// One product in a cart. The unit price is a snapshot from when the line
/// was added; checkout re-prices from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: ProductUuid,
    pub quantity: u32,
    pub unit_price: u64,
}

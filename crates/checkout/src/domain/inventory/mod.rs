//! Inventory

pub mod errors;
pub mod ledger;
pub mod models;
pub mod sweep;

pub use errors::InventoryError;
pub use ledger::InventoryLedger;
pub use models::*;
pub use sweep::ReservationSweeper;

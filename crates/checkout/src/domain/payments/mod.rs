//! Payments

pub mod errors;
pub mod models;
pub mod reconciler;

pub use errors::PaymentsError;
pub use models::*;
pub use reconciler::*;

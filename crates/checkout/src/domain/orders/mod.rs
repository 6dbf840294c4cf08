//! Orders

pub mod errors;
pub mod models;
pub mod repository;

pub use errors::OrdersError;
pub use models::*;
pub use repository::OrderRepository;

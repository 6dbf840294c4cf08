//! Checkout and payment-settlement core for the Karno storefront.
//!
//! Converts a customer's mutable cart into an immutable order, holds
//! inventory against concurrent buyers while payment is collected, and
//! reconciles asynchronous provider callbacks onto order state. Transport,
//! authentication, and catalog administration live in other crates and reach
//! this one through the traits exported from [`domain`], [`gateway`], and
//! [`notify`].

pub mod config;
pub mod context;
pub mod domain;
pub mod gateway;
pub mod notify;
pub mod webhook;

mod uuids;

#[cfg(test)]
mod test;

pub use uuids::TypedUuid;

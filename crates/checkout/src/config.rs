//! Checkout runtime settings.

use std::time::Duration;

use jiff::SignedDuration;

/// Tunables for the checkout and settlement pipeline.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Maximum quantity a single cart line may hold.
    pub line_quantity_cap: u32,

    /// How long a stock reservation is held before the sweep reclaims it.
    pub reservation_ttl: SignedDuration,

    /// How many times a conflicting order-state write is retried before the
    /// conflict is surfaced to the caller.
    pub reconcile_attempts: u32,

    /// How often the reservation sweep runs.
    pub sweep_interval: Duration,

    /// ISO 4217 currency code sent with payment intents.
    pub currency: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            line_quantity_cap: 99,
            reservation_ttl: SignedDuration::from_mins(15),
            reconcile_attempts: 3,
            sweep_interval: Duration::from_secs(60),
            currency: "USD".to_string(),
        }
    }
}

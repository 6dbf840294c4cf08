//! Payment provider gateway.
//!
//! The provider authorizes and captures charges out of process; checkout only
//! ever creates payment intents here and hears the outcome back through the
//! webhook entry point in [`crate::domain::payments`].

use std::fmt::{Display, Formatter, Result as FmtResult};

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::domain::orders::models::OrderUuid;

pub mod http;

pub use http::{HttpPaymentGateway, PaymentProviderConfig};

/// Provider-issued identifier of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentIntentId(String);

impl PaymentIntentId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PaymentIntentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

impl From<String> for PaymentIntentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PaymentIntentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What checkout asks the provider to charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Amount in the currency's minor unit.
    pub amount: u64,

    /// ISO 4217 currency code.
    pub currency: String,

    /// Order the charge settles, echoed back in callback metadata.
    pub order: OrderUuid,
}

/// A created payment intent; the client secret is what the storefront hands
/// to the browser to collect payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub intent: PaymentIntentId,
    pub client_secret: String,
}

#[derive(Debug, Error)]
pub enum PaymentGatewayError {
    #[error("payment provider request timed out")]
    Timeout,

    #[error("payment provider unavailable")]
    Unavailable(#[source] reqwest::Error),

    #[error("unexpected payment provider response: {0}")]
    UnexpectedResponse(String),
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for the given amount.
    async fn create_intent(
        &self,
        request: IntentRequest,
    ) -> Result<PaymentIntent, PaymentGatewayError>;
}

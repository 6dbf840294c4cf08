//! HTTP client for the payment provider's intent API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::gateway::{IntentRequest, PaymentGateway, PaymentGatewayError, PaymentIntent};

/// Configuration for connecting to the payment provider.
#[derive(Debug, Clone)]
pub struct PaymentProviderConfig {
    /// Provider API base address, e.g. `"https://api.provider.example"`.
    pub addr: String,

    /// Secret API key sent as a bearer token.
    pub api_key: String,

    /// Per-request timeout. A timed-out intent creation leaves the order
    /// awaiting payment; the provider callback or the reservation sweep
    /// resolves it.
    pub request_timeout: Duration,
}

/// HTTP implementation of [`PaymentGateway`].
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    config: PaymentProviderConfig,
    http: Client,
}

impl HttpPaymentGateway {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying HTTP client cannot be built.
    pub fn new(config: PaymentProviderConfig) -> Result<Self, PaymentGatewayError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(PaymentGatewayError::Unavailable)?;

        Ok(Self { config, http })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(
        &self,
        request: IntentRequest,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        let url = format!("{}/v1/payment_intents", self.config.addr);

        let body = serde_json::json!({
            "amount": request.amount,
            "currency": request.currency,
            "metadata": { "order_uuid": request.order.to_string() },
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    PaymentGatewayError::Timeout
                } else {
                    PaymentGatewayError::Unavailable(error)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(PaymentGatewayError::UnexpectedResponse(format!(
                "intent creation failed with status {status}: {text}"
            )));
        }

        let parsed: IntentResponse = response
            .json()
            .await
            .map_err(PaymentGatewayError::Unavailable)?;

        Ok(PaymentIntent {
            intent: parsed.id.into(),
            client_secret: parsed.client_secret,
        })
    }
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

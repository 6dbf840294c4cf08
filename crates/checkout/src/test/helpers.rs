//! Test doubles for the external collaborators.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::gateway::{IntentRequest, PaymentGateway, PaymentGatewayError, PaymentIntent};

/// Payment gateway that issues sequential intents in memory, and can be
/// flipped into a failure mode to exercise the retry-checkout path.
#[derive(Debug, Default)]
pub struct StubGateway {
    counter: AtomicU64,
    failing: AtomicBool,
    pub requests: Mutex<Vec<IntentRequest>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_intent` calls time out (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_intent(
        &self,
        request: IntentRequest,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentGatewayError::Timeout);
        }

        self.requests.lock().await.push(request);

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(PaymentIntent {
            intent: format!("pi_{n}").into(),
            client_secret: format!("cs_{n}"),
        })
    }
}

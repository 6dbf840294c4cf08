//! Payment Event Models

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::gateway::PaymentIntentId;

/// What the provider reported for a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    Failure,
}

/// A provider callback, already authenticated and parsed.
///
/// The provider delivers at least once; `provider_event_id` is what makes
/// processing at most once.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub provider_event_id: String,
    pub intent: PaymentIntentId,
    pub outcome: PaymentOutcome,
    pub amount: u64,
    pub received_at: Timestamp,
}

/// Wire form of a provider callback body.
#[derive(Debug, Deserialize)]
pub struct ProviderEventPayload {
    pub id: String,
    pub payment_intent: String,
    pub outcome: ProviderOutcome,
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOutcome {
    Succeeded,
    Failed,
}

impl From<ProviderEventPayload> for PaymentEvent {
    fn from(payload: ProviderEventPayload) -> Self {
        Self {
            provider_event_id: payload.id,
            intent: payload.payment_intent.into(),
            outcome: match payload.outcome {
                ProviderOutcome::Succeeded => PaymentOutcome::Success,
                ProviderOutcome::Failed => PaymentOutcome::Failure,
            },
            amount: payload.amount,
            received_at: Timestamp::now(),
        }
    }
}

/// Which provider events have already been applied, by event id.
#[derive(Debug, Default)]
pub struct ProcessedEventLog {
    seen: Mutex<FxHashMap<String, Timestamp>>,
}

impl ProcessedEventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_processed(&self, provider_event_id: &str) -> bool {
        self.seen.lock().await.contains_key(provider_event_id)
    }

    pub async fn record(&self, event: &PaymentEvent) {
        self.seen
            .lock()
            .await
            .insert(event.provider_event_id.clone(), event.received_at);
    }
}

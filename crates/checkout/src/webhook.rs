//! Provider callback signature verification.
//!
//! Callbacks are authenticated with an HMAC-SHA256 over the raw request body,
//! keyed with a secret shared with the provider. Verification fails closed:
//! a payload that does not verify never reaches the reconciler.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Number of secret bytes shared with the provider.
pub const WEBHOOK_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed webhook secret")]
    MalformedSecret,
}

/// Shared signing secret for webhook callbacks.
#[derive(Clone)]
pub struct WebhookSecret {
    bytes: [u8; WEBHOOK_SECRET_BYTES],
}

impl WebhookSecret {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; WEBHOOK_SECRET_BYTES]) -> Self {
        Self { bytes }
    }

    /// Generate a fresh random secret.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; WEBHOOK_SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);

        Self { bytes }
    }

    /// Parse a secret from its base64 form, as stored in provider settings.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::MalformedSecret`] when the input is not
    /// base64 or has the wrong length.
    pub fn from_base64(encoded: &str) -> Result<Self, WebhookError> {
        let decoded = BASE64
            .decode(encoded)
            .map_err(|_| WebhookError::MalformedSecret)?;

        let bytes: [u8; WEBHOOK_SECRET_BYTES] = decoded
            .try_into()
            .map_err(|_| WebhookError::MalformedSecret)?;

        Ok(Self { bytes })
    }

    /// Export the secret in base64, for handing to the provider dashboard.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret(**redacted**)")
    }
}

impl Drop for WebhookSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Verifies (and, for outbound tooling and tests, produces) callback
/// signatures.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: WebhookSecret,
}

impl WebhookVerifier {
    #[must_use]
    pub fn new(secret: WebhookSecret) -> Self {
        Self { secret }
    }

    /// Check `signature` (base64 HMAC-SHA256) against the raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidSignature`] when the signature is
    /// malformed or does not match.
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<(), WebhookError> {
        let provided = BASE64
            .decode(signature)
            .map_err(|_| WebhookError::InvalidSignature)?;

        self.mac(payload)?
            .verify_slice(&provided)
            .map_err(|_| WebhookError::InvalidSignature)
    }

    /// Compute the base64 signature for a payload.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::MalformedSecret`] when the key is unusable.
    pub fn sign(&self, payload: &[u8]) -> Result<String, WebhookError> {
        Ok(BASE64.encode(self.mac(payload)?.finalize().into_bytes()))
    }

    fn mac(&self, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret.bytes)
            .map_err(|_| WebhookError::MalformedSecret)?;
        mac.update(payload);

        Ok(mac)
    }
}

//! Provider API client and webhook signature verification.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;

use super::types::{Invoice, StripeErrorResponse, Subscription};

type HmacSha256 = Hmac<Sha256>;

/// Per-call network timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider API returned an error.
    #[error("provider API error: {error_type} - {message}")]
    Api {
        /// Error class from the provider.
        error_type: String,
        /// Human-readable message.
        message: String,
    },

    /// Webhook signature header missing parts or failing verification.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Signature timestamp outside the allowed tolerance.
    #[error("webhook timestamp outside tolerance")]
    StaleTimestamp,
}

/// Provider API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl StripeClient {
    /// Create a new provider client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Provider secret API key (`sk_test_...` or `sk_live_...`)
    /// * `base_url` - API base URL, usually `https://api.stripe.com/v1`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, StripeError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Fetch a subscription object by ID.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a provider error response.
    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, StripeError> {
        let response = self
            .http
            .get(format!("{}/subscriptions/{subscription_id}", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Fetch an invoice object by ID.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a provider error response.
    pub async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, StripeError> {
        let response = self
            .http
            .get(format!("{}/invoices/{invoice_id}", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(provider_error) => Err(StripeError::Api {
                error_type: provider_error.error.error_type,
                message: provider_error.error.message.unwrap_or_default(),
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
            }),
        }
    }
}

/// Verify a webhook signature header.
///
/// The header format is `t=timestamp,v1=hex[,v1=hex...]`; the signed
/// payload is `"{timestamp}.{body}"` and any `v1` entry may match.
/// Timestamps further than `tolerance_seconds` from now are rejected, so a
/// captured delivery cannot be replayed indefinitely.
///
/// # Errors
///
/// Returns an error when the header is malformed, the timestamp is out of
/// tolerance, or no signature matches.
pub fn verify_webhook_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
    tolerance_seconds: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let mut kv = part.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(ts)) => timestamp = Some(ts),
            (Some("v1"), Some(sig)) => signatures.push(sig),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature);
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::InvalidSignature)?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > tolerance_seconds {
        return Err(StripeError::StaleTimestamp);
    }

    let signed_payload = format!("{timestamp}.{payload}");
    let expected = hmac_sha256_hex(secret, &signed_payload);

    if signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature)
    }
}

/// Compute HMAC-SHA256 and return the hex-encoded result.
fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    // HMAC-SHA256 accepts keys of any size per RFC 2104, so `new_from_slice`
    // only fails if the Hmac implementation is broken.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison to prevent timing side channels.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const TOLERANCE: i64 = 300;

    fn sign(body: &str, timestamp: i64, secret: &str) -> String {
        let signature = hmac_sha256_hex(secret, &format!("{timestamp}.{body}"));
        format!("t={timestamp},v1={signature}")
    }

    #[test]
    fn client_creation_trims_trailing_slash() {
        let client = StripeClient::new("sk_test_xxx", "https://api.stripe.com/v1/").unwrap();
        assert_eq!(client.base_url, "https://api.stripe.com/v1");
    }

    #[test]
    fn valid_signature_verifies() {
        let body = r#"{"id":"evt_1"}"#;
        let header = sign(body, chrono::Utc::now().timestamp(), SECRET);
        assert!(verify_webhook_signature(body, &header, SECRET, TOLERANCE).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = r#"{"id":"evt_1"}"#;
        let header = sign(body, chrono::Utc::now().timestamp(), "whsec_other");
        assert!(matches!(
            verify_webhook_signature(body, &header, SECRET, TOLERANCE),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign(r#"{"id":"evt_1"}"#, chrono::Utc::now().timestamp(), SECRET);
        assert!(matches!(
            verify_webhook_signature(r#"{"id":"evt_2"}"#, &header, SECRET, TOLERANCE),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let body = r#"{"id":"evt_1"}"#;
        let header = sign(body, chrono::Utc::now().timestamp() - 3600, SECRET);
        assert!(matches!(
            verify_webhook_signature(body, &header, SECRET, TOLERANCE),
            Err(StripeError::StaleTimestamp)
        ));
    }

    #[test]
    fn header_without_timestamp_is_rejected() {
        assert!(matches!(
            verify_webhook_signature("{}", "v1=deadbeef", SECRET, TOLERANCE),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn header_without_signatures_is_rejected() {
        let ts = chrono::Utc::now().timestamp();
        assert!(matches!(
            verify_webhook_signature("{}", &format!("t={ts}"), SECRET, TOLERANCE),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn any_matching_v1_entry_verifies() {
        let body = r#"{"id":"evt_1"}"#;
        let ts = chrono::Utc::now().timestamp();
        let good = hmac_sha256_hex(SECRET, &format!("{ts}.{body}"));
        let header = format!("t={ts},v1=deadbeef,v1={good}");
        assert!(verify_webhook_signature(body, &header, SECRET, TOLERANCE).is_ok());
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("ab", "abc"));
    }
}

//! Service configuration.

use std::path::Path;

use serde::Deserialize;

/// Default tolerance for webhook signature timestamps, in seconds.
const DEFAULT_SIGNATURE_TOLERANCE_SECONDS: i64 = 300;

/// Errors raised while loading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required secret or variable is missing everywhere we looked.
    #[error("missing configuration: {0}")]
    Missing(&'static str),
}

/// One configured product line: a webhook signing secret and the table its
/// events land in.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductConfig {
    /// Product name, used as the webhook path segment.
    pub name: String,
    /// Record-store table path (e.g. `v2/tables/TitlePro_PaymentLogs/records`).
    pub table: String,
    /// Per-endpoint webhook signing secret.
    pub webhook_secret: String,
}

/// Service configuration loaded from environment variables and secrets
/// files.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Payment-provider API key.
    pub stripe_api_key: String,

    /// Payment-provider API base URL (overridable for tests).
    pub stripe_api_url: String,

    /// Path to the record-store credentials file. Refreshed tokens are
    /// written back into this file.
    pub store_credentials_file: String,

    /// Configured product lines.
    pub products: Vec<ProductConfig>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Allowed clock skew for webhook signature timestamps, in seconds.
    pub signature_tolerance_seconds: i64,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    api_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider API key or the product
    /// configuration cannot be found anywhere.
    pub fn from_env() -> Result<Self, ConfigError> {
        let (stripe_api_key, stripe_webhook_secret) = load_stripe_secrets();
        let stripe_api_key = stripe_api_key.ok_or(ConfigError::Missing("STRIPE_API_KEY"))?;

        let products = load_products(stripe_webhook_secret)?;

        Ok(Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            stripe_api_key,
            stripe_api_url: std::env::var("STRIPE_API_URL")
                .unwrap_or_else(|_| "https://api.stripe.com/v1".into()),
            store_credentials_file: std::env::var("STORE_CREDENTIALS_FILE")
                .unwrap_or_else(|_| ".secrets/recordstore.json".into()),
            products,
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            signature_tolerance_seconds: std::env::var("SIGNATURE_TOLERANCE_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SIGNATURE_TOLERANCE_SECONDS),
        })
    }
}

/// Load provider secrets from file or environment.
fn load_stripe_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/stripe.json",
        "paylog/.secrets/stripe.json",
        "../.secrets/stripe.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            tracing::info!(path = %path, "Loaded provider secrets from file");
            return (Some(secrets.api_key), secrets.webhook_secret);
        }
    }

    tracing::debug!("Provider secrets file not found, using environment variables");
    (
        std::env::var("STRIPE_API_KEY").ok(),
        std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
    )
}

/// Load the product lines from file or environment.
///
/// The env fallback configures a single product named `payments`, which
/// keeps a one-product deployment down to two variables (`STORE_TABLE`
/// plus a signing secret).
fn load_products(default_webhook_secret: Option<String>) -> Result<Vec<ProductConfig>, ConfigError> {
    let secret_paths = [
        ".secrets/products.json",
        "paylog/.secrets/products.json",
        "../.secrets/products.json",
    ];

    for path in &secret_paths {
        if let Ok(products) = load_secrets_file::<Vec<ProductConfig>>(path) {
            tracing::info!(path = %path, count = products.len(), "Loaded product config from file");
            return Ok(products);
        }
    }

    tracing::debug!("Product config file not found, using environment variables");
    let table = std::env::var("STORE_TABLE").map_err(|_| ConfigError::Missing("STORE_TABLE"))?;
    let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
        .ok()
        .or(default_webhook_secret)
        .ok_or(ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?;

    Ok(vec![ProductConfig {
        name: "payments".into(),
        table,
        webhook_secret,
    }])
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

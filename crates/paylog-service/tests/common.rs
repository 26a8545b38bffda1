//! Common test utilities for paylog integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use axum::Router;
use axum_test::TestServer;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tempfile::TempDir;
use wiremock::MockServer;

use paylog_service::{create_router, AppState, ProductConfig, ServiceConfig};

/// Product line configured in every harness.
pub const PRODUCT: &str = "titlepro";

/// Table the configured product writes into.
pub const TABLE: &str = "v2/tables/TitlePro_PaymentLogs/records";

/// The same table as an HTTP path, for wiremock matchers.
pub const TABLE_PATH: &str = "/v2/tables/TitlePro_PaymentLogs/records";

/// Signing secret for the configured product.
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Webhook endpoint for the configured product.
pub const WEBHOOK_PATH: &str = "/webhooks/stripe/titlepro";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Mocked record store.
    pub store: MockServer,
    /// Mocked payment-provider API.
    pub stripe: MockServer,
    /// Holds the credentials file for the test duration.
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with both upstreams mocked.
    pub async fn new() -> Self {
        let store = MockServer::start().await;
        let stripe = MockServer::start().await;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let credentials_path = temp_dir.path().join("recordstore.json");
        std::fs::write(
            &credentials_path,
            serde_json::to_string_pretty(&serde_json::json!({
                "api_url": store.uri(),
                "token_url": format!("{}/oauth/token", store.uri()),
                "client_id": "client-id",
                "client_secret": "client-secret",
                "access_token": "test-bearer",
                "refresh_token": "test-refresh"
            }))
            .expect("Failed to serialize credentials"),
        )
        .expect("Failed to write credentials file");

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            stripe_api_key: "sk_test_key".into(),
            stripe_api_url: stripe.uri(),
            store_credentials_file: credentials_path.to_string_lossy().to_string(),
            products: vec![ProductConfig {
                name: PRODUCT.into(),
                table: TABLE.into(),
                webhook_secret: WEBHOOK_SECRET.into(),
            }],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            signature_tolerance_seconds: 300,
        };

        let state = AppState::new(config).expect("Failed to build state");
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            stripe,
            _temp_dir: temp_dir,
        }
    }

    /// Sign a body with the configured product's secret, the way the
    /// provider does.
    pub fn sign(&self, body: &str) -> String {
        sign_with(body, WEBHOOK_SECRET)
    }
}

/// Build a `stripe-signature` header over `body` with the given secret.
pub fn sign_with(body: &str, secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts any key size");
    mac.update(format!("{timestamp}.{body}").as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}

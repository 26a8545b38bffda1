//! Shared helpers for record-store client tests.

#![allow(dead_code)] // Each integration test file uses a subset.

use paylog_store::{RecordStoreClient, StoreCredentials};
use wiremock::MockServer;

/// Table path as configured (no leading slash).
pub const TABLE: &str = "v2/tables/Dev_PaymentLogs/records";

/// The same table as an HTTP path, for wiremock matchers.
pub const TABLE_PATH: &str = "/v2/tables/Dev_PaymentLogs/records";

/// Token endpoint path on the mock server.
pub const TOKEN_PATH: &str = "/oauth/token";

/// Credentials pointing every URL at the mock server.
pub fn credentials(server: &MockServer, access_token: &str) -> StoreCredentials {
    StoreCredentials {
        api_url: server.uri(),
        token_url: format!("{}{}", server.uri(), TOKEN_PATH),
        client_id: "client-id".into(),
        client_secret: "client-secret".into(),
        access_token: access_token.into(),
        refresh_token: "refresh-1".into(),
    }
}

/// A client holding a token the mock server accepts.
pub fn client(server: &MockServer) -> RecordStoreClient {
    RecordStoreClient::new(credentials(server, "bearer-1")).expect("failed to build client")
}

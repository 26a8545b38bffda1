//! Token refresh and 401-retry behavior.

mod common;

use common::{credentials, TABLE, TABLE_PATH, TOKEN_PATH};
use paylog_store::{CredentialFile, RecordStoreClient, StoreError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn empty_rows() -> serde_json::Value {
    json!({ "Result": [] })
}

#[tokio::test]
async fn a_401_triggers_one_refresh_and_one_retry() {
    let server = MockServer::start().await;
    let client = RecordStoreClient::new(credentials(&server, "stale-bearer")).unwrap();

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("authorization", "Bearer stale-bearer"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-bearer",
            "refresh_token": "fresh-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("authorization", "Bearer fresh-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_rows()))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client.get(TABLE, None).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn a_persistent_401_is_fatal_not_retried_forever() {
    let server = MockServer::start().await;
    let client = RecordStoreClient::new(credentials(&server, "stale-bearer")).unwrap();

    // Both the original call and the post-refresh retry are rejected.
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get(TABLE, None).await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized));
}

#[tokio::test]
async fn rejected_refresh_token_falls_back_to_client_credentials() {
    let server = MockServer::start().await;
    let client = RecordStoreClient::new(credentials(&server, "stale-bearer")).unwrap();

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("authorization", "Bearer stale-bearer"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "minted-bearer",
            "refresh_token": "minted-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("authorization", "Bearer minted-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_rows()))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client.get(TABLE, None).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn token_endpoint_failure_surfaces_as_token_exchange_error() {
    let server = MockServer::start().await;
    let client = RecordStoreClient::new(credentials(&server, "stale-bearer")).unwrap();

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get(TABLE, None).await.unwrap_err();
    assert!(matches!(err, StoreError::TokenExchange { status: 500, .. }));
}

#[tokio::test]
async fn concurrent_401s_share_a_single_refresh() {
    let server = MockServer::start().await;
    let client = RecordStoreClient::new(credentials(&server, "stale-bearer")).unwrap();

    // Depending on interleaving, one or both tasks observe the stale token.
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("authorization", "Bearer stale-bearer"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1..=2)
        .mount(&server)
        .await;

    // The invariant under test: one exchange, however the calls interleave.
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-bearer",
            "refresh_token": "fresh-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("authorization", "Bearer fresh-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_rows()))
        .expect(2)
        .mount(&server)
        .await;

    let (a, b) = tokio::join!(client.get(TABLE, None), client.get(TABLE, None));
    assert!(a.unwrap().is_empty());
    assert!(b.unwrap().is_empty());
}

#[tokio::test]
async fn refreshed_tokens_are_persisted_back_to_the_credentials_file() {
    let server = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let secrets_path = dir.path().join("recordstore.json");
    std::fs::write(
        &secrets_path,
        serde_json::to_string_pretty(&json!({
            "api_url": server.uri(),
            "token_url": format!("{}{}", server.uri(), TOKEN_PATH),
            "client_id": "client-id",
            "client_secret": "client-secret",
            "access_token": "stale-bearer",
            "refresh_token": "refresh-1",
            "environment": "dev"
        }))
        .unwrap(),
    )
    .unwrap();

    let file = CredentialFile::new(&secrets_path);
    let client = RecordStoreClient::from_file(file.clone()).unwrap();

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("authorization", "Bearer stale-bearer"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-bearer",
            "refresh_token": "fresh-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("authorization", "Bearer fresh-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_rows()))
        .expect(1)
        .mount(&server)
        .await;

    client.get(TABLE, None).await.unwrap();

    // The new pair round-trips through the file; unrelated keys survive.
    let reloaded = file.load().unwrap();
    assert_eq!(reloaded.access_token, "fresh-bearer");
    assert_eq!(reloaded.refresh_token, "fresh-refresh");

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&secrets_path).unwrap()).unwrap();
    assert_eq!(raw["environment"], "dev");
}

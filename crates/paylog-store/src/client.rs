//! Record-store REST client.
//!
//! The store exposes each table as a REST resource: `GET`/`POST`/`PUT`/
//! `DELETE` against the table path, with row filters passed as a `q.where`
//! equality expression and listings wrapped in a `{"Result": [...]}`
//! envelope. Calls are bearer-authenticated; a 401 triggers one token
//! refresh and one retry of the original call.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::credentials::{CredentialFile, StoreCredentials};
use crate::error::StoreError;

/// Per-call network timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// In-memory bearer/refresh token pair.
#[derive(Debug)]
struct TokenPair {
    access: String,
    refresh: String,
}

/// Successful response from a record-store write.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    /// HTTP status the store answered with (200 for updates, 201 for
    /// inserts).
    pub status: u16,
    /// Response body, `Null` when the store sent none.
    pub body: Value,
}

/// Token endpoint response shape.
///
/// The refresh grant may answer without a new refresh token, in which case
/// the current one stays valid.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Envelope the store wraps row listings in.
#[derive(Debug, Deserialize)]
struct RowsEnvelope {
    #[serde(rename = "Result")]
    result: Vec<serde_json::Map<String, Value>>,
}

/// Client for the record store's table REST API.
///
/// The client owns the mutable token pair behind a lock: concurrent calls
/// that see a 401 at the same time produce one token exchange, and the
/// refreshed pair is persisted to the credentials file before any caller
/// gets to use it.
#[derive(Debug)]
pub struct RecordStoreClient {
    http: Client,
    api_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    tokens: Mutex<TokenPair>,
    persist_to: Option<CredentialFile>,
}

impl RecordStoreClient {
    /// Create a client from in-memory credentials.
    ///
    /// Refreshed tokens are kept in memory only; use [`Self::from_file`]
    /// when they should survive a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credentials: StoreCredentials) -> Result<Self, StoreError> {
        Self::with_persistence(credentials, None)
    }

    /// Create a client that loads credentials from `file` and persists
    /// refreshed tokens back into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the HTTP client
    /// cannot be built.
    pub fn from_file(file: CredentialFile) -> Result<Self, StoreError> {
        let credentials = file.load()?;
        Self::with_persistence(credentials, Some(file))
    }

    fn with_persistence(
        credentials: StoreCredentials,
        persist_to: Option<CredentialFile>,
    ) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(StoreError::Http)?;

        Ok(Self {
            http,
            api_url: credentials.api_url.trim_end_matches('/').to_string(),
            token_url: credentials.token_url,
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            tokens: Mutex::new(TokenPair {
                access: credentials.access_token,
                refresh: credentials.refresh_token,
            }),
            persist_to,
        })
    }

    /// Fetch rows from `table`, optionally narrowed by an equality filter
    /// (e.g. `CustomerID='cus_123'`).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, on a non-success status, or
    /// when a 401 persists after a token refresh.
    pub async fn get(
        &self,
        table: &str,
        filter: Option<&str>,
    ) -> Result<Vec<serde_json::Map<String, Value>>, StoreError> {
        let url = self.table_url(table);
        let response = self
            .send_authorized(|token| {
                let mut request = self.http.get(&url).bearer_auth(token);
                if let Some(expr) = filter {
                    request = request.query(&[("q.where", expr)]);
                }
                request
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(response).await);
        }
        let envelope: RowsEnvelope = response.json().await?;
        Ok(envelope.result)
    }

    /// Partially update the rows matching `match_expr` (an equality
    /// expression over one column, e.g. `PK_ID=42`).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, on a non-success status, or
    /// when a 401 persists after a token refresh.
    pub async fn put(
        &self,
        table: &str,
        fields: &Value,
        match_expr: &str,
    ) -> Result<StoreResponse, StoreError> {
        let url = self.table_url(table);
        let response = self
            .send_authorized(|token| {
                self.http
                    .put(&url)
                    .bearer_auth(token)
                    .query(&[("q.where", match_expr)])
                    .json(fields)
            })
            .await?;
        Self::into_store_response(response).await
    }

    /// Insert one new row.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, on a non-success status, or
    /// when a 401 persists after a token refresh.
    pub async fn post(&self, table: &str, fields: &Value) -> Result<StoreResponse, StoreError> {
        let url = self.table_url(table);
        let response = self
            .send_authorized(|token| self.http.post(&url).bearer_auth(token).json(fields))
            .await?;
        Self::into_store_response(response).await
    }

    /// Remove the rows matching `match_expr`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, on a non-success status, or
    /// when a 401 persists after a token refresh.
    pub async fn delete(&self, table: &str, match_expr: &str) -> Result<StoreResponse, StoreError> {
        let url = self.table_url(table);
        let response = self
            .send_authorized(|token| {
                self.http
                    .delete(&url)
                    .bearer_auth(token)
                    .query(&[("q.where", match_expr)])
            })
            .await?;
        Self::into_store_response(response).await
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.api_url, table.trim_start_matches('/'))
    }

    /// Send a bearer-authenticated request, refreshing the token once on
    /// 401 and retrying the same call once.
    ///
    /// A second 401 after the refresh is fatal for the call; it is never
    /// retried indefinitely.
    async fn send_authorized<F>(&self, build: F) -> Result<reqwest::Response, StoreError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let token = self.tokens.lock().await.access.clone();
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("Record store rejected the bearer token, refreshing");
        let fresh = self.refresh_access_token(&token).await?;
        let retried = build(&fresh).send().await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(StoreError::Unauthorized);
        }
        Ok(retried)
    }

    /// Replace the stale bearer token, single-flight across callers.
    ///
    /// The lock is held across the exchange and the file write, so a
    /// successful refresh is persisted before any caller can use the new
    /// token. A caller that lost the race observes an access token that no
    /// longer matches the one it saw go stale and skips the exchange.
    async fn refresh_access_token(&self, stale: &str) -> Result<String, StoreError> {
        let mut tokens = self.tokens.lock().await;

        if tokens.access != stale {
            return Ok(tokens.access.clone());
        }

        let exchanged = match self.exchange_refresh_token(&tokens.refresh).await {
            Ok(response) => response,
            Err(StoreError::TokenExchange { status: 401, .. }) => {
                // The refresh token itself has gone bad; mint a fresh pair.
                tracing::warn!("Refresh token rejected, falling back to client-credentials grant");
                self.exchange_client_credentials().await?
            }
            Err(e) => return Err(e),
        };

        let access = exchanged.access_token;
        let refresh = exchanged
            .refresh_token
            .unwrap_or_else(|| tokens.refresh.clone());

        if let Some(file) = &self.persist_to {
            file.persist_tokens(&access, &refresh)?;
        }

        tokens.access = access.clone();
        tokens.refresh = refresh;
        tracing::info!("Record store access token refreshed");
        Ok(access)
    }

    /// `grant_type=refresh_token` exchange, client-authenticated via HTTP
    /// Basic.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, StoreError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&params)
            .send()
            .await?;
        Self::parse_token_response(response).await
    }

    /// `grant_type=client_credentials` exchange, minting a fresh
    /// bearer+refresh pair.
    async fn exchange_client_credentials(&self) -> Result<TokenResponse, StoreError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = self.http.post(&self.token_url).form(&params).send().await?;
        Self::parse_token_response(response).await
    }

    async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::TokenExchange {
            status: status.as_u16(),
            message,
        })
    }

    async fn into_store_response(response: reqwest::Response) -> Result<StoreResponse, StoreError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(response).await);
        }
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(StoreResponse {
            status: status.as_u16(),
            body,
        })
    }

    async fn api_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        StoreError::Api { status, message }
    }
}

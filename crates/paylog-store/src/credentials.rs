//! Credential state for the record store and its on-disk persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// OAuth-style credential state for the record store.
///
/// The access and refresh tokens are the mutable half: the client replaces
/// them whenever a 401 triggers a refresh, and writes them back through
/// [`CredentialFile::persist_tokens`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreCredentials {
    /// Base URL of the record store's REST API.
    pub api_url: String,
    /// Access-token endpoint URL.
    pub token_url: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Current bearer access token.
    pub access_token: String,
    /// Current refresh token.
    pub refresh_token: String,
}

/// Read/write handle on the JSON secrets file holding [`StoreCredentials`].
///
/// Persisting tokens rewrites only the two token keys; every other key in
/// the file is preserved as-is, so the same file can carry deployment
/// extras (comments-as-keys, environment labels) without the relay
/// clobbering them.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    /// Create a handle on the given secrets file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path this handle reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load credentials from the secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON of
    /// the expected shape.
    pub fn load(&self) -> Result<StoreCredentials, StoreError> {
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Persist a refreshed token pair back to the secrets file.
    ///
    /// The file is rewritten through a temporary sibling and a rename, so a
    /// crash mid-write cannot leave it half-written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON object,
    /// or the rewrite fails.
    pub fn persist_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), StoreError> {
        let contents = std::fs::read_to_string(&self.path)?;
        let mut doc: Value = serde_json::from_str(&contents)?;

        let map = doc.as_object_mut().ok_or_else(|| {
            StoreError::Configuration(format!(
                "credentials file {} is not a JSON object",
                self.path.display()
            ))
        })?;
        map.insert(
            "access_token".to_string(),
            Value::String(access_token.to_string()),
        );
        map.insert(
            "refresh_token".to_string(),
            Value::String(refresh_token.to_string()),
        );

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&doc)?)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Persisted refreshed store tokens");
        Ok(())
    }
}

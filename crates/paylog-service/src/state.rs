//! Application state.

use std::collections::HashMap;
use std::sync::Arc;

use paylog_store::{CredentialFile, RecordStoreClient};

use crate::config::{ProductConfig, ServiceConfig};
use crate::stripe::StripeClient;

/// Errors raised while building application state at startup.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The record-store client could not be created.
    #[error("record store: {0}")]
    Store(#[from] paylog_store::StoreError),

    /// The provider client could not be created.
    #[error("payment provider: {0}")]
    Stripe(#[from] crate::stripe::StripeError),
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: ServiceConfig,

    /// Record-store client. Owns the mutable token state and writes
    /// refreshed tokens back to the credentials file.
    pub store: Arc<RecordStoreClient>,

    /// Provider client for enrichment fetches.
    pub stripe: Arc<StripeClient>,

    /// Product lines keyed by webhook path segment.
    pub products: HashMap<String, ProductConfig>,
}

impl AppState {
    /// Build application state from configuration.
    ///
    /// The record-store credentials file is loaded here, so a missing or
    /// malformed file fails startup instead of the first delivery.
    ///
    /// # Errors
    ///
    /// Returns an error when either client cannot be created.
    pub fn new(config: ServiceConfig) -> Result<Self, StateError> {
        let store = RecordStoreClient::from_file(CredentialFile::new(
            &config.store_credentials_file,
        ))?;

        let stripe = StripeClient::new(&config.stripe_api_key, &config.stripe_api_url)?;

        let products = config
            .products
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect();

        Ok(Self {
            config,
            store: Arc::new(store),
            stripe: Arc::new(stripe),
            products,
        })
    }
}

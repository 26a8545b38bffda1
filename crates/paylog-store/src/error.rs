//! Error types for the record-store client.

/// Errors that can occur when talking to the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned a non-success status.
    #[error("store API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// The call was rejected with 401 even after a token refresh.
    #[error("unauthorized after token refresh")]
    Unauthorized,

    /// The token endpoint rejected the exchange.
    #[error("token exchange failed: {status} - {message}")]
    TokenExchange {
        /// HTTP status code from the token endpoint.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// A response body did not have the expected shape.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing the credentials file failed.
    #[error("credential store error: {0}")]
    Credentials(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

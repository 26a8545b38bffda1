//! Paylog webhook relay service.
//!
//! This crate provides the HTTP surface of the relay:
//!
//! - Signed payment-provider webhook endpoints, one per product line
//! - Event dispatch into the record-store upsert protocol
//! - Provider object fetches for payload enrichment
//!
//! # Delivery semantics
//!
//! Signature and payload problems are rejected with 4xx and never
//! processed. Once an event verifies, processing is best-effort: a failed
//! enrichment fetch or store write is logged and the delivery is still
//! acknowledged, so the provider does not retry into the same failure.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for consistency

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod stripe;

pub use config::{ConfigError, ProductConfig, ServiceConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, StateError};
pub use stripe::{StripeClient, StripeError};

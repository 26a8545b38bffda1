//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{health, webhooks};
use crate::state::AppState;

/// Maximum concurrent webhook deliveries.
///
/// The upsert protocol's scan-then-write window widens under concurrency
/// and provider delivery volume is low, so the relay stays close to the
/// one-event-at-a-time model it was written for.
const WEBHOOK_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Webhooks (signature verification, concurrency-limited)
/// - `POST /webhooks/stripe/:product` - Provider events for one product line
///
/// Unmatched paths fall through to a 404 handler.
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    let webhook_routes = Router::new()
        .route("/stripe/:product", post(webhooks::stripe_webhook))
        .layer(ConcurrencyLimitLayer::new(WEBHOOK_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/webhooks", webhook_routes)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Default handler for unmatched paths.
async fn not_found() -> ApiError {
    ApiError::NotFound("no such endpoint".into())
}

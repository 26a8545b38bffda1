//! Webhook handlers: signed provider events into the record store.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use paylog_core::{end_date_from_epoch, fields, EventKind, UpsertPayload};
use paylog_store::{MergeOutcome, UpdateOutcome};

use crate::config::ProductConfig;
use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{self, Invoice, Subscription};

/// Provider webhook envelope.
#[derive(Debug, Deserialize)]
pub struct StripeWebhook {
    /// Event ID.
    pub id: String,
    /// Event type string.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: StripeEventData,
}

/// Event data container.
#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    /// The event's primary object.
    pub object: serde_json::Value,
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the event was accepted.
    pub received: bool,
}

/// Failures while relaying a verified event into the store.
///
/// These are our problem, not the sender's: the delivery is acknowledged
/// regardless and the failure logged for manual reconciliation.
#[derive(Debug, thiserror::Error)]
enum RelayError {
    #[error("event object malformed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("provider fetch failed: {0}")]
    Provider(#[from] stripe::StripeError),

    #[error("store write failed: {0}")]
    Store(#[from] paylog_store::StoreError),
}

/// Handle provider webhooks for one product line.
///
/// Signature and payload problems are the sender's fault and surface as
/// 400. Past verification, processing is best-effort: failures are logged
/// loudly and the event is still acknowledged so the provider does not
/// storm retries into the same failure.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    Path(product): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Some(product) = state.products.get(&product) else {
        return Err(ApiError::NotFound(format!("unknown product: {product}")));
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing stripe-signature header".into()))?;

    stripe::verify_webhook_signature(
        &body,
        signature,
        &product.webhook_secret,
        state.config.signature_tolerance_seconds,
    )
    .map_err(|e| {
        tracing::warn!(product = %product.name, error = %e, "Invalid webhook signature");
        ApiError::BadRequest("Invalid webhook signature".into())
    })?;

    let webhook: StripeWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        product = %product.name,
        event_type = %webhook.event_type,
        event_id = %webhook.id,
        "Received webhook"
    );

    let Some(kind) = EventKind::from_event_type(&webhook.event_type) else {
        tracing::debug!(event_type = %webhook.event_type, "Unhandled event kind");
        return Ok(Json(WebhookResponse { received: true }));
    };

    if let Err(e) = dispatch(&state, product, kind, &webhook.data.object).await {
        tracing::error!(
            product = %product.name,
            event_id = %webhook.id,
            event_type = %webhook.event_type,
            error = %e,
            "Webhook processing failed; event acknowledged without a completed store write"
        );
    }

    Ok(Json(WebhookResponse { received: true }))
}

async fn dispatch(
    state: &AppState,
    product: &ProductConfig,
    kind: EventKind,
    object: &serde_json::Value,
) -> Result<(), RelayError> {
    match kind {
        EventKind::SubscriptionCreated | EventKind::SubscriptionUpdated => {
            handle_subscription_change(state, product, object).await
        }
        EventKind::SubscriptionDeleted => {
            handle_subscription_deleted(state, product, object).await
        }
        EventKind::InvoicePaid => handle_invoice_paid(state, product, object).await,
    }
}

/// Subscription created/updated: merge the subscription's state into the
/// customer's row, inserting one when this is a new customer.
///
/// The event object is the subscription itself; the one enrichment fetch
/// pulls the latest invoice for the customer email, which subscriptions do
/// not carry.
async fn handle_subscription_change(
    state: &AppState,
    product: &ProductConfig,
    object: &serde_json::Value,
) -> Result<(), RelayError> {
    let subscription: Subscription = serde_json::from_value(object.clone())?;

    let mut payload = UpsertPayload::new(&subscription.customer);
    payload.set(fields::STATUS, subscription.status.as_str());
    if let Some(end_date) = subscription.current_period_end.and_then(end_date_from_epoch) {
        payload.set(fields::END_DATE, end_date);
    }
    if let Some(quantity) = subscription.quantity() {
        payload.set(fields::UNITS_PURCHASED, quantity);
    }

    if let Some(invoice_id) = &subscription.latest_invoice {
        match state.stripe.get_invoice(invoice_id).await {
            Ok(invoice) => {
                if let Some(email) = invoice.customer_email {
                    payload.set(fields::EMAIL, email);
                }
            }
            Err(e) => {
                // The email is nice-to-have; merge what the event gave us.
                tracing::warn!(
                    invoice_id = %invoice_id,
                    error = %e,
                    "Email enrichment fetch failed, merging without it"
                );
            }
        }
    }

    let outcome = state.store.merge_record(&product.table, &payload).await?;
    match outcome {
        MergeOutcome::Created(_) => {
            tracing::info!(
                customer_id = %subscription.customer,
                subscription_id = %subscription.id,
                "New customer row created from subscription event"
            );
        }
        MergeOutcome::Updated(_) => {
            tracing::info!(
                customer_id = %subscription.customer,
                subscription_id = %subscription.id,
                status = %subscription.status,
                "Customer row updated from subscription event"
            );
        }
    }

    Ok(())
}

/// Subscription deleted: record the terminal status on the customer's row.
///
/// Never inserts. A cancellation for a customer who never completed a
/// first payment has nothing to update, and that is fine.
async fn handle_subscription_deleted(
    state: &AppState,
    product: &ProductConfig,
    object: &serde_json::Value,
) -> Result<(), RelayError> {
    let subscription: Subscription = serde_json::from_value(object.clone())?;

    let mut payload = UpsertPayload::new(&subscription.customer);
    payload.set(fields::STATUS, subscription.status.as_str());
    if let Some(end_date) = subscription.current_period_end.and_then(end_date_from_epoch) {
        payload.set(fields::END_DATE, end_date);
    }

    match state
        .store
        .update_record(&product.table, &subscription.customer, &payload)
        .await?
    {
        UpdateOutcome::Updated(_) => {
            tracing::info!(
                customer_id = %subscription.customer,
                status = %subscription.status,
                "Subscription cancellation recorded"
            );
        }
        UpdateOutcome::NoMatch => {
            tracing::warn!(
                customer_id = %subscription.customer,
                "Cancellation for a customer with no row, nothing to update"
            );
        }
    }

    Ok(())
}

/// Invoice paid: refresh the customer's row with the invoice email and the
/// state of the subscription it pays for.
///
/// A zero-due invoice (trial start, 100% discount) changes nothing and
/// produces no store call at all.
async fn handle_invoice_paid(
    state: &AppState,
    product: &ProductConfig,
    object: &serde_json::Value,
) -> Result<(), RelayError> {
    let invoice: Invoice = serde_json::from_value(object.clone())?;

    if invoice.amount_due == 0 {
        tracing::info!(
            invoice_id = %invoice.id,
            customer_id = %invoice.customer,
            billing_reason = ?invoice.billing_reason,
            "Invoice has nothing due, skipping"
        );
        return Ok(());
    }

    let mut payload = UpsertPayload::new(&invoice.customer);
    if let Some(email) = &invoice.customer_email {
        payload.set(fields::EMAIL, email.as_str());
    }

    if let Some(subscription_id) = &invoice.subscription {
        match state.stripe.get_subscription(subscription_id).await {
            Ok(subscription) => {
                payload.set(fields::STATUS, subscription.status.as_str());
                if let Some(end_date) =
                    subscription.current_period_end.and_then(end_date_from_epoch)
                {
                    payload.set(fields::END_DATE, end_date);
                }
                if let Some(quantity) = subscription.quantity() {
                    payload.set(fields::UNITS_PURCHASED, quantity);
                }
            }
            Err(e) => {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    error = %e,
                    "Subscription enrichment fetch failed, merging invoice fields only"
                );
            }
        }
    }

    let outcome = state.store.merge_record(&product.table, &payload).await?;
    match outcome {
        MergeOutcome::Created(_) => {
            tracing::info!(
                customer_id = %invoice.customer,
                invoice_id = %invoice.id,
                "New customer row created from paid invoice"
            );
        }
        MergeOutcome::Updated(_) => {
            tracing::info!(
                customer_id = %invoice.customer,
                invoice_id = %invoice.id,
                "Customer row updated from paid invoice"
            );
        }
    }

    Ok(())
}

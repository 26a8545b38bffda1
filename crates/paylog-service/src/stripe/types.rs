//! Provider API object shapes, reduced to the fields the relay reads.

use serde::Deserialize;

/// A subscription object.
///
/// Deserialized both from API fetches and from webhook event objects, so
/// everything beyond the identity fields is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    /// Subscription ID (`sub_...`).
    pub id: String,
    /// Owning customer ID (`cus_...`).
    pub customer: String,
    /// Subscription status (`active`, `past_due`, `canceled`, ...).
    pub status: String,
    /// End of the current billing period, epoch seconds.
    #[serde(default)]
    pub current_period_end: Option<i64>,
    /// Latest invoice ID, when one exists.
    #[serde(default)]
    pub latest_invoice: Option<String>,
    /// Subscription line items (seat quantities).
    #[serde(default)]
    pub items: Option<SubscriptionItems>,
}

impl Subscription {
    /// Seat quantity from the first line item, when present.
    #[must_use]
    pub fn quantity(&self) -> Option<u64> {
        self.items
            .as_ref()
            .and_then(|items| items.data.first())
            .and_then(|item| item.quantity)
    }
}

/// List container for subscription items.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItems {
    /// The items themselves.
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// One subscription line item.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    /// Seat quantity.
    #[serde(default)]
    pub quantity: Option<u64>,
}

/// An invoice object.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    /// Invoice ID (`in_...`).
    pub id: String,
    /// Owning customer ID.
    pub customer: String,
    /// Customer email, when the provider has one on file.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Amount due, in the smallest currency unit.
    #[serde(default)]
    pub amount_due: i64,
    /// Why the invoice was created (`subscription_create`, ...).
    #[serde(default)]
    pub billing_reason: Option<String>,
    /// The subscription this invoice pays for, when there is one.
    #[serde(default)]
    pub subscription: Option<String>,
}

/// Error envelope the provider wraps failures in.
#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    /// The error payload.
    pub error: StripeErrorBody,
}

/// Provider error payload.
#[derive(Debug, Deserialize)]
pub struct StripeErrorBody {
    /// Error class.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

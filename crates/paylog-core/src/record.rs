//! Row payloads for the record store.
//!
//! Tables in the record store are schemaless from the client's point of
//! view: a row is a flat mapping of column name to JSON value. The relay
//! keys every row on the payment provider's customer identifier.

use chrono::DateTime;
use serde_json::{Map, Value};

/// Well-known column names in the payment-log tables.
pub mod fields {
    /// Store-assigned primary identifier.
    pub const PK_ID: &str = "PK_ID";
    /// Business key: the payment provider's customer identifier.
    pub const CUSTOMER_ID: &str = "CustomerID";
    /// Subscription status as reported by the provider.
    pub const STATUS: &str = "Status";
    /// Customer email.
    pub const EMAIL: &str = "Email";
    /// End of the current billing period.
    pub const END_DATE: &str = "EndDate";
    /// Seats purchased on the subscription.
    pub const UNITS_PURCHASED: &str = "UnitsPurchased";
}

/// A flat field-name to value mapping destined for one table row.
///
/// Every payload carries the `CustomerID` business key; event handlers add
/// the columns their event kind knows about (`Status`, `EndDate`, `Email`,
/// `UnitsPurchased`, ...). [`UpsertPayload::to_value`] produces the exact
/// JSON object sent to the record store.
#[derive(Debug, Clone)]
pub struct UpsertPayload {
    customer_id: String,
    extra: Map<String, Value>,
}

impl UpsertPayload {
    /// Create a payload keyed on the given customer.
    #[must_use]
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            extra: Map::new(),
        }
    }

    /// The business key this payload is keyed on.
    #[must_use]
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Set a column value.
    ///
    /// The business key is fixed at construction; writes to `CustomerID`
    /// are ignored.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        if name == fields::CUSTOMER_ID {
            return;
        }
        self.extra.insert(name.to_string(), value.into());
    }

    /// Look up a column value previously set on this payload.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// The JSON object sent to the record store, `CustomerID` included.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert(
            fields::CUSTOMER_ID.to_string(),
            Value::String(self.customer_id.clone()),
        );
        Value::Object(map)
    }
}

/// Convert provider epoch seconds into the store's `YYYY-MM-DD` date form.
///
/// Returns `None` for timestamps outside the representable range.
#[must_use]
pub fn end_date_from_epoch(epoch_seconds: i64) -> Option<String> {
    DateTime::from_timestamp(epoch_seconds, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

//! Merge-or-create protocol over the record store, keyed by `CustomerID`.

use paylog_core::{fields, UpsertPayload};
use serde_json::Value;

use crate::client::{RecordStoreClient, StoreResponse};
use crate::error::StoreError;

/// Which write path a merge took.
#[derive(Debug)]
pub enum MergeOutcome {
    /// No row carried the customer id; a new row was inserted.
    Created(StoreResponse),
    /// An existing row was updated in place.
    Updated(StoreResponse),
}

/// Result of an update against an existing customer row.
///
/// `NoMatch` is an ordinary outcome, not an error: "nothing to update" and
/// "the request failed" must stay distinguishable for callers.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The matching row was updated.
    Updated(StoreResponse),
    /// No row carries this customer id; nothing was written.
    NoMatch,
}

impl RecordStoreClient {
    /// Update the row keyed by the payload's `CustomerID`, or insert a new
    /// one when no row matches.
    ///
    /// The scan-then-write sequence is not atomic: two concurrent merges
    /// for the same customer can both observe "no row" and both insert.
    /// The store's API offers no conditional write, so `CustomerID`
    /// uniqueness is the table schema's responsibility; when duplicates do
    /// exist, the first row in the store's response order wins.
    ///
    /// # Errors
    ///
    /// Returns an error when the scan or the write fails.
    pub async fn merge_record(
        &self,
        table: &str,
        payload: &UpsertPayload,
    ) -> Result<MergeOutcome, StoreError> {
        match self.find_primary_id(table, payload.customer_id()).await? {
            Some(pk_id) => {
                let response = self
                    .put(
                        table,
                        &payload.to_value(),
                        &format!("{}={pk_id}", fields::PK_ID),
                    )
                    .await?;
                tracing::info!(
                    customer_id = %payload.customer_id(),
                    %pk_id,
                    "Merged payload into existing row"
                );
                Ok(MergeOutcome::Updated(response))
            }
            None => {
                let response = self.post(table, &payload.to_value()).await?;
                tracing::info!(
                    customer_id = %payload.customer_id(),
                    "Inserted new row for customer"
                );
                Ok(MergeOutcome::Created(response))
            }
        }
    }

    /// Update the row keyed by `customer_id`, reporting
    /// [`UpdateOutcome::NoMatch`] when the customer has no row. Never
    /// inserts.
    ///
    /// # Errors
    ///
    /// Returns an error when the scan or the write fails.
    pub async fn update_record(
        &self,
        table: &str,
        customer_id: &str,
        payload: &UpsertPayload,
    ) -> Result<UpdateOutcome, StoreError> {
        match self.find_primary_id(table, customer_id).await? {
            Some(pk_id) => {
                let response = self
                    .put(
                        table,
                        &payload.to_value(),
                        &format!("{}={pk_id}", fields::PK_ID),
                    )
                    .await?;
                tracing::info!(customer_id, %pk_id, "Updated existing row");
                Ok(UpdateOutcome::Updated(response))
            }
            None => Ok(UpdateOutcome::NoMatch),
        }
    }

    /// Scan `table` for the first row whose `CustomerID` matches, and
    /// return its primary identifier as a filter literal.
    async fn find_primary_id(
        &self,
        table: &str,
        customer_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let rows = self.get(table, None).await?;
        for row in &rows {
            if row.get(fields::CUSTOMER_ID).and_then(Value::as_str) != Some(customer_id) {
                continue;
            }
            match row.get(fields::PK_ID) {
                Some(Value::Number(n)) => return Ok(Some(n.to_string())),
                Some(Value::String(s)) => return Ok(Some(s.clone())),
                _ => {
                    tracing::warn!(customer_id, "Matching row has no usable PK_ID, skipping it");
                }
            }
        }
        Ok(None)
    }
}

//! Record-store client and upsert protocol for paylog.
//!
//! This crate talks to the low-code record store's table REST API: bearer
//! authentication with an OAuth-style refresh flow, plus the merge-or-create
//! protocol the relay uses to keep one row per customer.
//!
//! # Example
//!
//! ```no_run
//! use paylog_core::{fields, UpsertPayload};
//! use paylog_store::{CredentialFile, MergeOutcome, RecordStoreClient};
//!
//! # async fn example() -> Result<(), paylog_store::StoreError> {
//! let client = RecordStoreClient::from_file(CredentialFile::new(".secrets/recordstore.json"))?;
//!
//! let mut payload = UpsertPayload::new("cus_123");
//! payload.set(fields::STATUS, "active");
//!
//! match client.merge_record("v2/tables/PaymentLogs/records", &payload).await? {
//!     MergeOutcome::Created(_) => println!("new customer row"),
//!     MergeOutcome::Updated(_) => println!("existing row updated"),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod credentials;
mod error;
mod upsert;

pub use client::{RecordStoreClient, StoreResponse};
pub use credentials::{CredentialFile, StoreCredentials};
pub use error::StoreError;
pub use upsert::{MergeOutcome, UpdateOutcome};

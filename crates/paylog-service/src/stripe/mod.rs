//! Payment-provider integration.
//!
//! The provider contributes two things to the relay:
//!
//! - Object fetches (subscriptions, invoices) to enrich webhook payloads
//! - The webhook signature scheme inbound deliveries are verified with

pub mod client;
pub mod types;

pub use client::{verify_webhook_signature, StripeClient, StripeError};
pub use types::*;

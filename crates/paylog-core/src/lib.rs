//! Core types for the paylog relay.
//!
//! This crate provides the types shared by the relay service and the
//! record-store client:
//!
//! - **Records**: [`UpsertPayload`], the well-known column names in
//!   [`record::fields`]
//! - **Events**: [`EventKind`], the provider event kinds the relay processes

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod event;
pub mod record;

pub use event::EventKind;
pub use record::{end_date_from_epoch, fields, UpsertPayload};

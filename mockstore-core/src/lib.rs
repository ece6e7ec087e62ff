//! Core types and rules for the mockstore in-memory document database.
//!
//! This crate holds the leaf building blocks shared by the store engine and
//! the facade crate:
//!
//! - **Error handling** ([`error`]) - The error enum and result alias used
//!   across the workspace
//! - **Paths** ([`path`]) - Collection/document id and field-path validation,
//!   plus the [`path::FieldPath`] type
//! - **Write values** ([`value`]) - Write payloads and the sentinel values
//!   (delete, server timestamp, array union/remove) they may carry
//! - **Queries** ([`query`]) - Immutable query rule values and their builders
//! - **Change records** ([`change`]) - Descriptions of how a committed
//!   operation moved a document within its collection
//! - **Listeners** ([`listener`]) - The ordered callback registry backing
//!   snapshot subscriptions

#[allow(unused_extern_crates)]
extern crate self as mockstore_core;

pub mod change;
pub mod error;
pub mod listener;
pub mod path;
pub mod query;
pub mod value;

//! Core types and trait definitions for the Senechal health-summary engine.
//!
//! The crate has no database dependency. The canonical store and the
//! per-source adapters implement the traits defined here, and the
//! orchestrator drives them through those traits alone.

// Trait methods spell out `impl Future + Send`; impls use `async fn`.
#![allow(async_fn_in_trait)]

pub mod duration;
pub mod error;
pub mod metric;
pub mod orchestrator;
pub mod period;
pub mod source;
pub mod store;
pub mod timestamp;

pub use error::{BoxError, Error, Result};

//! Driver layer behind the `senechal-etl` binary.
//!
//! Loads the path configuration, turns command-line scope flags into the
//! set of periods to mark dirty, and runs the orchestrator for one or all
//! sources against the canonical [`SqliteStore`](senechal_store_sqlite::SqliteStore).

pub mod config;
pub mod error;
pub mod plan;
pub mod run;
pub mod status;

pub use config::EtlConfig;
pub use error::{Error, Result};

#[cfg(test)]
mod tests;

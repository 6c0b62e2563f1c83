//! Per-source adapters that turn vendor raw stores into canonical metric
//! summaries.
//!
//! Each adapter owns a static MetricMap from vendor identifiers to canonical
//! metric ids. The maps are disjoint, so two sources never write the same
//! summary row.

mod adapter;
mod raw;

pub mod error;
pub mod garmin;
pub mod withings;

pub use adapter::Adapter;
pub use error::{Error, Result};
pub use garmin::{GarminAdapter, GarminPaths};
pub use withings::{WithingsAdapter, WithingsPaths};

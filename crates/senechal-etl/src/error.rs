//! Error type for `senechal-etl`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing required setting {0}")]
  MissingSetting(&'static str),

  #[error("{key} points at {path:?}, which does not exist")]
  RawStoreMissing { key: &'static str, path: PathBuf },

  #[error("invalid date format: {0}. Use DD/MM/YYYY")]
  InvalidSince(String),

  #[error("invalid date format: {0}. Use YYYY-MM-DD")]
  InvalidDate(String),

  #[error("days must be a positive number within the calendar range, got {0}")]
  InvalidDays(i64),

  #[error("failed to read configuration: {0}")]
  Config(#[from] config::ConfigError),

  #[error("failed to read {path:?}: {source}")]
  DotEnv { path: PathBuf, source: dotenv::Error },

  #[error(transparent)]
  Core(#[from] senechal_core::Error),

  #[error(transparent)]
  Store(#[from] senechal_store_sqlite::Error),

  #[error(transparent)]
  Adapter(#[from] senechal_sources::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

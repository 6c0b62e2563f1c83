//! Error types for `senechal-core`.

use thiserror::Error;

/// Type-erased error from a store or adapter backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid duration encoding: {0:?}")]
  InvalidDuration(String),

  #[error("invalid timestamp: {0:?}")]
  InvalidTimestamp(String),

  #[error("unknown period kind: {0:?}")]
  UnknownPeriodKind(String),

  #[error("unknown source: {0:?}")]
  UnknownSource(String),

  #[error("adapter error: {0}")]
  Adapter(#[source] BoxError),

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl Error {
  pub(crate) fn adapter<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Adapter(Box::new(err))
  }

  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

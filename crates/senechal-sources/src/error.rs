//! Error type for `senechal-sources`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] senechal_core::Error),

  #[error("raw store error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A raw value that is neither numeric nor a duration encoding.
  #[error("malformed value in {table}.{column}: {value}")]
  Malformed {
    table:  &'static str,
    column: String,
    value:  String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

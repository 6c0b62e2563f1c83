//! Error type for `senechal-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] senechal_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A `sync_metadata` value that is not an integer.
  #[error("corrupt cursor for {source_name}: {value:?}")]
  Cursor { source_name: String, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

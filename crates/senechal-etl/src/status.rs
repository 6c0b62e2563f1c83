//! Read-only view of the change log, cursors and summary table.

use std::fmt;

use senechal_core::{
  source::Source,
  store::{ChangeTracker, CursorStore, SummaryStore},
};
use senechal_store_sqlite::SqliteStore;
use serde::Serialize;
use strum::IntoEnumIterator as _;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
  pub source:  Source,
  pub pending: usize,
  pub cursor:  i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
  pub sources:   Vec<SourceStatus>,
  pub summaries: usize,
}

pub async fn collect(store: &SqliteStore) -> Result<Status> {
  let mut sources = Vec::new();
  for source in Source::iter() {
    sources.push(SourceStatus {
      source,
      pending: store.pending_count(source).await?,
      cursor: store.last_processed_id(source).await?,
    });
  }
  let summaries = store.summary_count().await?;
  Ok(Status { sources, summaries })
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for s in &self.sources {
      writeln!(
        f,
        "{:<10} {:>6} pending   cursor {}",
        s.source.as_str(),
        s.pending,
        s.cursor
      )?;
    }
    write!(f, "{:<10} {:>6} rows", "summaries", self.summaries)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn renders_one_line_per_source() {
    let status = Status {
      sources:   vec![
        SourceStatus { source: Source::Garmin, pending: 3, cursor: 0 },
        SourceStatus { source: Source::Withings, pending: 0, cursor: 42 },
      ],
      summaries: 17,
    };
    let text = status.to_string();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().next().unwrap().starts_with("garmin"));
    assert!(text.contains("cursor 42"));
    assert!(text.ends_with("17 rows"));
  }
}

//! Store locations, read once at startup.
//!
//! Settings come from an optional TOML file, then an optional `.env` file,
//! then the process environment; later layers win. So
//! `SENECHAL_DB_PATH=/data/senechal.db` in the environment overrides the same
//! key in `.env`, which overrides `senechal_db_path = "..."` in the TOML file.

use std::path::{Path, PathBuf};

use senechal_core::source::Source;
use senechal_sources::{Adapter, GarminAdapter, GarminPaths, WithingsAdapter, WithingsPaths};
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EtlConfig {
  /// The canonical summary store; always required.
  pub senechal_db_path:          Option<PathBuf>,
  pub withings_db_path:          Option<PathBuf>,
  pub garmin_db_path:            Option<PathBuf>,
  pub garmin_monitoring_db_path: Option<PathBuf>,
  pub garmin_summary_db_path:    Option<PathBuf>,
}

impl EtlConfig {
  /// Read `file` and `env_file` (each only if it exists) and the
  /// environment.
  pub fn load(file: &Path, env_file: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::default().source(Some(read_env_file(env_file)?)))
      .add_source(config::Environment::default())
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  pub fn store_path(&self) -> Result<PathBuf> {
    self
      .senechal_db_path
      .as_deref()
      .map(expand_tilde)
      .ok_or(Error::MissingSetting("SENECHAL_DB_PATH"))
  }

  pub fn garmin_paths(&self) -> Result<GarminPaths> {
    Ok(GarminPaths {
      garmin_db:     raw_store(&self.garmin_db_path, "GARMIN_DB_PATH")?,
      monitoring_db: raw_store(&self.garmin_monitoring_db_path, "GARMIN_MONITORING_DB_PATH")?,
      summary_db:    raw_store(&self.garmin_summary_db_path, "GARMIN_SUMMARY_DB_PATH")?,
    })
  }

  pub fn withings_paths(&self) -> Result<WithingsPaths> {
    Ok(WithingsPaths { db: raw_store(&self.withings_db_path, "WITHINGS_DB_PATH")? })
  }

  /// The adapter for `source`, once its raw stores are known to exist.
  pub fn adapter(&self, source: Source) -> Result<Adapter> {
    Ok(match source {
      Source::Garmin => Adapter::Garmin(GarminAdapter::new(self.garmin_paths()?)),
      Source::Withings => Adapter::Withings(WithingsAdapter::new(self.withings_paths()?)),
    })
  }
}

/// `KEY=value` pairs from a dotenv file; an absent file is empty.
fn read_env_file(path: &Path) -> Result<config::Map<String, String>> {
  if !path.exists() {
    return Ok(config::Map::new());
  }
  let dotenv_err = |source| Error::DotEnv { path: path.to_path_buf(), source };
  dotenv::from_path_iter(path)
    .map_err(dotenv_err)?
    .map(|pair| pair.map_err(dotenv_err))
    .collect()
}

/// A raw store must be configured and already present on disk.
fn raw_store(value: &Option<PathBuf>, key: &'static str) -> Result<PathBuf> {
  let path = value.as_deref().map(expand_tilde).ok_or(Error::MissingSetting(key))?;
  if !path.exists() {
    return Err(Error::RawStoreMissing { key, path });
  }
  Ok(path)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonical_store_is_required() {
    let err = EtlConfig::default().store_path().unwrap_err();
    assert!(matches!(err, Error::MissingSetting("SENECHAL_DB_PATH")));
  }

  #[test]
  fn only_the_requested_source_needs_paths() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("withings.db");
    std::fs::write(&db, b"").unwrap();
    let cfg = EtlConfig { withings_db_path: Some(db.clone()), ..Default::default() };

    assert_eq!(cfg.withings_paths().unwrap().db, db);
    assert!(matches!(
      cfg.adapter(Source::Garmin),
      Err(Error::MissingSetting("GARMIN_DB_PATH"))
    ));
  }

  #[test]
  fn missing_raw_file_is_a_config_error() {
    let cfg = EtlConfig {
      withings_db_path: Some(PathBuf::from("/nonexistent/withings.db")),
      ..Default::default()
    };
    assert!(matches!(
      cfg.withings_paths(),
      Err(Error::RawStoreMissing { key: "WITHINGS_DB_PATH", .. })
    ));
  }

  #[test]
  fn reads_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("senechal.toml");
    std::fs::write(
      &file,
      "senechal_db_path = \"/data/senechal.db\"\ngarmin_db_path = \"/data/garmin.db\"\n",
    )
    .unwrap();

    let cfg = EtlConfig::load(&file, &dir.path().join(".env")).unwrap();
    assert!(cfg.senechal_db_path.is_some());
    assert!(cfg.garmin_db_path.is_some());
  }

  #[test]
  fn absent_files_are_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(EtlConfig::load(&dir.path().join("missing.toml"), &dir.path().join(".env")).is_ok());
  }

  #[test]
  fn env_file_overrides_toml() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("senechal.toml");
    std::fs::write(
      &file,
      "withings_db_path = \"/toml/withings.db\"\ngarmin_summary_db_path = \"/toml/summary.db\"\n",
    )
    .unwrap();
    let env_file = dir.path().join(".env");
    std::fs::write(
      &env_file,
      "# store locations\nWITHINGS_DB_PATH=/dotenv/withings.db\nGARMIN_MONITORING_DB_PATH=\"/dotenv/monitoring.db\"\n",
    )
    .unwrap();

    let cfg = EtlConfig::load(&file, &env_file).unwrap();
    assert_eq!(cfg.withings_db_path, Some(PathBuf::from("/dotenv/withings.db")));
    assert_eq!(cfg.garmin_monitoring_db_path, Some(PathBuf::from("/dotenv/monitoring.db")));
    assert_eq!(cfg.garmin_summary_db_path, Some(PathBuf::from("/toml/summary.db")));
  }

  #[test]
  fn malformed_env_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let env_file = dir.path().join(".env");
    std::fs::write(&env_file, "WITHINGS_DB_PATH='unterminated\n").unwrap();

    let err = EtlConfig::load(&dir.path().join("missing.toml"), &env_file).unwrap_err();
    assert!(matches!(err, Error::DotEnv { .. }));
  }

  #[test]
  fn tilde_expands_to_home() {
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    }
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}

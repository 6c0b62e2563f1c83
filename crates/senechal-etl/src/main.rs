//! `senechal-etl`: incremental health-data aggregation.
//!
//! Reads store locations from `senechal.toml` (or `--config`), `.env` (or
//! `--env-file`) and the environment, marks the requested periods dirty and
//! recomputes every pending period's summaries.
//!
//! ```text
//! senechal-etl garmin --since 01/03/2024
//! senechal-etl withings --dry-run
//! senechal-etl pending
//! senechal-etl status --json
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{ArgGroup, Args, Parser, Subcommand};
use senechal_core::source::Source;
use senechal_etl::{EtlConfig, plan::Scope, run, status};
use senechal_store_sqlite::SqliteStore;
use strum::IntoEnumIterator as _;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Senechal health-data ETL")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "senechal.toml", global = true)]
  config: PathBuf,

  /// Path to a dotenv file with store locations.
  #[arg(long, default_value = ".env", global = true)]
  env_file: PathBuf,

  /// Enable debug logging.
  #[arg(long, global = true)]
  debug: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Mark Garmin periods dirty and process them.
  Garmin(RunArgs),
  /// Mark Withings periods dirty and process them.
  Withings(RunArgs),
  /// Process already-dirty periods for every source, or just one.
  Pending {
    #[arg(long)]
    source: Option<Source>,
  },
  /// Show pending periods, cursors and the summary row count.
  Status {
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
  },
}

#[derive(Args)]
#[command(group(ArgGroup::new("scope").args(["since", "days", "force_date"])))]
struct RunArgs {
  /// Show what would be done without making changes.
  #[arg(long)]
  dry_run: bool,

  /// Process data since a specific date.
  #[arg(long, value_name = "DD/MM/YYYY")]
  since: Option<String>,

  /// Process data for the last N days.
  #[arg(long, value_name = "N", allow_negative_numbers = true)]
  days: Option<i64>,

  /// Process the periods containing one date.
  #[arg(long, value_name = "YYYY-MM-DD")]
  force_date: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy(),
    )
    .init();

  let config = EtlConfig::load(&cli.config, &cli.env_file)
    .with_context(|| format!("failed to read config from {:?}", cli.config))?;
  let store_path = config.store_path()?;

  match cli.command {
    Command::Garmin(args) => run_one(&config, &store_path, Source::Garmin, args).await,
    Command::Withings(args) => run_one(&config, &store_path, Source::Withings, args).await,
    Command::Pending { source } => {
      let store = open_store(&store_path).await?;
      let sources: Vec<Source> = match source {
        Some(source) => vec![source],
        None => Source::iter().collect(),
      };
      tracing::info!("Starting health data ETL process");
      let reports = run::run_all_pending(&store, &config, &sources).await;
      let pending: usize = reports.iter().map(|r| r.pending).sum();
      tracing::info!(
        "ETL process complete: {} sources run, {pending} periods still pending",
        reports.len()
      );
      Ok(())
    }
    Command::Status { json } => {
      let store = open_store(&store_path).await?;
      let status = status::collect(&store).await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
      } else {
        println!("{status}");
      }
      Ok(())
    }
  }
}

async fn run_one(
  config: &EtlConfig,
  store_path: &std::path::Path,
  source: Source,
  args: RunArgs,
) -> anyhow::Result<()> {
  // Validate everything before touching the canonical store.
  let today = chrono::Local::now().date_naive();
  let scope = Scope::from_flags(args.since.as_deref(), args.days, args.force_date.as_deref())?;
  scope.days(today)?;
  let adapter = config
    .adapter(source)
    .with_context(|| format!("{source} is not configured"))?;
  let store = open_store(store_path).await?;

  run::run_source(&store, &adapter, scope, args.dry_run, today)
    .await
    .with_context(|| format!("error in {source} ETL"))?;
  Ok(())
}

async fn open_store(path: &std::path::Path) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

//! saferplace-admin — operator access to the incident store.
//!
//! Reads `saferplace.toml` (or the path given with `--config`), layers
//! `SAFERPLACE_*` environment variables on top, opens the SQLite store and
//! runs one command. Results are printed as JSON.
//!
//! ```sh
//! SAFERPLACE_DATABASE__DSN=/var/lib/saferplace/incidents.db \
//!   saferplace-admin pending
//! ```

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use saferplace_core::{
  Cancel, Resolution,
  incident::{Coordinates, NewComment, Region},
  store::{IncidentStore, SessionStore},
};
use saferplace_store_sqlite::{SqliteStore, StoreConfig};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "SaferPlace incident store admin")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "saferplace.toml")]
  config: PathBuf,

  /// Abort the command after this many seconds.
  #[arg(long, default_value_t = 30)]
  timeout: u64,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the schema if it is missing and exit.
  Init,
  /// List incidents awaiting review.
  Pending,
  /// Show one incident with its comments.
  View { id: String },
  /// Set an incident's resolution and record why.
  Review {
    id:         String,
    #[arg(long, value_enum)]
    resolution: Outcome,
    #[arg(long)]
    author:     String,
    #[arg(long)]
    message:    String,
  },
  /// Visible incidents within `km` of a point.
  Radius {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    #[arg(long)]
    km:  f64,
  },
  /// Visible incidents after `since` inside a region given in degrees × 100.
  Region {
    /// Unix seconds; only incidents strictly newer are returned.
    #[arg(long, default_value_t = 0)]
    since:    i64,
    #[arg(long, allow_hyphen_values = true)]
    north:    i64,
    #[arg(long, allow_hyphen_values = true)]
    south:    i64,
    #[arg(long, allow_hyphen_values = true)]
    west:     i64,
    #[arg(long, allow_hyphen_values = true)]
    east:     i64,
    /// Only alerted incidents.
    #[arg(long)]
    alerting: bool,
  },
  /// Check whether a session token is currently valid.
  Session { token: String },
}

/// Resolutions a reviewer may apply.
#[derive(Clone, Copy, ValueEnum)]
enum Outcome {
  Accepted,
  Alerted,
  Rejected,
}

impl From<Outcome> for Resolution {
  fn from(o: Outcome) -> Self {
    match o {
      Outcome::Accepted => Resolution::Accepted,
      Outcome::Alerted => Resolution::Alerted,
      Outcome::Rejected => Resolution::Rejected,
    }
  }
}

/// Top-level configuration file layout.
#[derive(Deserialize, Default)]
struct AdminConfig {
  #[serde(default)]
  database: StoreConfig,
}

/// `SAFERPLACE_DATABASE__DSN` sets `database.dsn`.
fn environment() -> config::Environment {
  config::Environment::with_prefix("SAFERPLACE")
    .prefix_separator("_")
    .separator("__")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(environment())
    .build()
    .context("failed to read config file")?;

  let cfg: AdminConfig = settings
    .try_deserialize()
    .context("failed to deserialise AdminConfig")?;

  let store = SqliteStore::connect(&cfg.database)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.database.dsn))?;

  let cancel = Cancel::with_timeout(Duration::from_secs(cli.timeout));
  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("interrupted, cancelling");
      on_signal.cancel();
    }
  });

  match cli.command {
    Command::Init => {
      tracing::info!(dsn = %cfg.database.dsn, "schema ready");
    }
    Command::Pending => {
      print_json(&store.list_without_review(cancel).await?)?;
    }
    Command::View { id } => {
      print_json(&store.view(cancel, id).await?)?;
    }
    Command::Review { id, resolution, author, message } => {
      let comment = NewComment::new(Utc::now(), author, message);
      let stored = store.review(cancel, id, resolution.into(), comment).await?;
      print_json(&stored)?;
    }
    Command::Radius { lat, lon, km } => {
      let found = store
        .list_in_radius(cancel, Coordinates::new(lat, lon), km)
        .await?;
      print_json(&found)?;
    }
    Command::Region { since, north, south, west, east, alerting } => {
      let since = DateTime::from_timestamp(since, 0)
        .with_context(|| format!("--since out of range: {since}"))?;
      let region = Region { north, south, west, east };
      let found = if alerting {
        store.alerting_incidents(cancel, since, region).await?
      } else {
        store.list_in_region(cancel, since, region).await?
      };
      print_json(&found)?;
    }
    Command::Session { token } => {
      store.is_valid_session(cancel, token).await?;
      println!("valid");
    }
  }

  Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cli_parses_review() {
    let cli = Cli::try_parse_from([
      "saferplace-admin",
      "review",
      "abc",
      "--resolution",
      "alerted",
      "--author",
      "mod-1",
      "--message",
      "confirmed by two reports",
    ])
    .unwrap();
    match cli.command {
      Command::Review { id, resolution, .. } => {
        assert_eq!(id, "abc");
        assert_eq!(Resolution::from(resolution), Resolution::Alerted);
      }
      _ => panic!("expected review"),
    }
  }

  #[test]
  fn cli_accepts_negative_region_bounds() {
    let cli = Cli::try_parse_from([
      "saferplace-admin",
      "region",
      "--north",
      "5400",
      "--south",
      "5300",
      "--west",
      "-700",
      "--east",
      "-600",
    ])
    .unwrap();
    assert!(matches!(cli.command, Command::Region { west: -700, east: -600, .. }));
  }

  #[test]
  fn config_without_database_table_uses_defaults() {
    let settings = config::Config::builder().build().unwrap();
    let cfg: AdminConfig = settings.try_deserialize().unwrap();
    assert_eq!(cfg.database, StoreConfig::default());
  }

  #[test]
  fn config_reads_database_table() {
    let settings = config::Config::builder()
      .add_source(config::File::from_str(
        "[database]\ndriver = \"sqlite\"\ndsn = \":memory:\"\n",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap();
    let cfg: AdminConfig = settings.try_deserialize().unwrap();
    assert_eq!(cfg.database.driver, "sqlite");
    assert_eq!(cfg.database.dsn, ":memory:");
  }

  #[test]
  fn environment_overrides_file_dsn() {
    let vars = [("SAFERPLACE_DATABASE__DSN".to_owned(), "/var/lib/x.db".to_owned())];
    let settings = config::Config::builder()
      .add_source(config::File::from_str(
        "[database]\ndsn = \"file:incidents.db\"\n",
        config::FileFormat::Toml,
      ))
      .add_source(environment().source(Some(vars.into_iter().collect())))
      .build()
      .unwrap();
    let cfg: AdminConfig = settings.try_deserialize().unwrap();
    assert_eq!(cfg.database.dsn, "/var/lib/x.db");
    assert_eq!(cfg.database.driver, StoreConfig::default().driver);
  }
}

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use transits::horizons::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use transits::job;

/// Transits - publish a geocentric ephemeris feed from JPL Horizons
#[derive(Parser)]
#[command(name = "transits")]
#[command(about = "Fetches current geocentric positions for the configured bodies and writes a static JSON feed")]
#[command(version)]
struct Cli {
  /// Path to the target list
  #[arg(long, default_value = "config/targets.json")]
  config: PathBuf,

  /// Path the feed snapshot is written to
  #[arg(long, default_value = "docs/feed_now.json")]
  output: PathBuf,

  /// Horizons API base URL
  #[arg(long, env = "TRANSITS_HORIZONS_URL", default_value = DEFAULT_BASE_URL)]
  base_url: String,

  /// Per-request timeout in seconds
  #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
  timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

  let written = job::execute(job::Options {
    config_path: &cli.config,
    output_path: &cli.output,
    base_url: &cli.base_url,
    timeout: Duration::from_secs(cli.timeout_secs),
  })
  .await?;

  println!("Wrote {} with {} objects.", cli.output.display(), written);
  Ok(())
}

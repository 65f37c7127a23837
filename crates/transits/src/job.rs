use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config;
use crate::feed::{self, FeedSnapshot, ObservationRecord};
use crate::horizons::{self, Client};

pub struct Options<'a> {
  pub config_path: &'a Path,
  pub output_path: &'a Path,
  pub base_url: &'a str,
  pub timeout: Duration,
}

/// Run one fetch-and-publish pass: load the target list, query each
/// target sequentially for the current instant, and write the snapshot.
///
/// A failed target is logged and skipped; the run still publishes
/// whatever succeeded. Config and output failures abort.
pub async fn execute(options: Options<'_>) -> Result<usize> {
  let targets = config::load_targets(options.config_path)?;
  info!(count = targets.len(), "loaded target list");

  let client = Client::new(options.base_url, options.timeout)?;

  let now = Utc::now();
  let epoch_jd = horizons::julian_date(now);

  let mut records = Vec::with_capacity(targets.len());
  for target in &targets {
    match client.query(&target.id, epoch_jd).await {
      Ok(eph) => {
        info!(id = %target.id, "fetched ephemeris");
        records.push(ObservationRecord::from_ephemeris(target, eph, epoch_jd));
      }
      Err(e) => {
        warn!(id = %target.id, error = %e, "skipping target");
      }
    }
  }

  let written = records.len();
  let snapshot = FeedSnapshot::new(now, records);
  feed::write_snapshot(&snapshot, options.output_path)
    .with_context(|| format!("Failed to publish feed to {}", options.output_path.display()))?;

  Ok(written)
}

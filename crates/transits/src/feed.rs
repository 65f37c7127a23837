use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::config::Target;
use crate::horizons::Ephemeris;

/// One body's position at query time. Serialized into the `objects`
/// array of the snapshot; never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
  pub id: String,
  pub targetname: String,
  pub datetime_utc: String,
  pub jd: f64,
  pub ecl_lon_deg: f64,
  pub ecl_lat_deg: f64,
  pub ra_deg: f64,
  pub dec_deg: f64,
  pub delta_au: f64,
  pub r_au: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub elong_deg: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phase_angle_deg: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub constellation: Option<String>,
}

impl ObservationRecord {
  /// Build a record from a parsed ephemeris row. The config label stands
  /// in when Horizons didn't echo a resolved target name.
  pub fn from_ephemeris(target: &Target, eph: Ephemeris, jd: f64) -> Self {
    Self {
      id: target.id.clone(),
      targetname: eph.targetname.unwrap_or_else(|| target.label.clone()),
      datetime_utc: eph.datetime_str,
      jd,
      ecl_lon_deg: eph.ecl_lon_deg,
      ecl_lat_deg: eph.ecl_lat_deg,
      ra_deg: eph.ra_deg,
      dec_deg: eph.dec_deg,
      delta_au: eph.delta_au,
      r_au: eph.r_au,
      elong_deg: eph.elong_deg,
      phase_angle_deg: eph.phase_angle_deg,
      constellation: eph.constellation,
    }
  }
}

/// The published document: a generation timestamp plus the records for
/// every target that resolved this run. Each run writes a complete
/// replacement of the previous file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSnapshot {
  pub generated_at_utc: String,
  pub observer: String,
  pub refplane: String,
  pub source: String,
  pub objects: Vec<ObservationRecord>,
}

impl FeedSnapshot {
  pub fn new(generated_at: DateTime<Utc>, objects: Vec<ObservationRecord>) -> Self {
    Self {
      generated_at_utc: generated_at.to_rfc3339(),
      observer: "geocentric (Earth center)".to_string(),
      refplane: "earth".to_string(),
      source: "JPL Horizons".to_string(),
      objects,
    }
  }
}

/// Write the snapshot to `path`, replacing whatever was there.
///
/// The document lands in a temp file in the destination directory first
/// and is renamed into place, so a failed run never leaves a partial
/// file behind.
pub fn write_snapshot(snapshot: &FeedSnapshot, path: &Path) -> Result<()> {
  let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
  fs::create_dir_all(dir)
    .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

  let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;

  let mut temp = NamedTempFile::new_in(dir)
    .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
  temp
    .write_all(json.as_bytes())
    .with_context(|| format!("Failed to write snapshot to {}", temp.path().display()))?;
  temp
    .persist(path)
    .with_context(|| format!("Failed to move snapshot into place at {}", path.display()))?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use tempfile::TempDir;

  fn sample_record() -> ObservationRecord {
    ObservationRecord {
      id: "499".to_string(),
      targetname: "Mars (499)".to_string(),
      datetime_utc: "2026-Aug-30 00:00".to_string(),
      jd: 2_460_917.5,
      ecl_lon_deg: 120.5,
      ecl_lat_deg: -1.2,
      ra_deg: 45.0,
      dec_deg: 10.0,
      delta_au: 1.01,
      r_au: 1.0,
      elong_deg: None,
      phase_angle_deg: None,
      constellation: None,
    }
  }

  #[test]
  fn test_optional_fields_omitted_from_json() {
    let json = serde_json::to_string(&sample_record()).unwrap();
    assert!(json.contains("\"ecl_lon_deg\":120.5"));
    assert!(!json.contains("elong_deg"));
    assert!(!json.contains("constellation"));
  }

  #[test]
  fn test_snapshot_envelope() {
    let when = Utc.with_ymd_and_hms(2026, 8, 30, 0, 0, 0).unwrap();
    let snapshot = FeedSnapshot::new(when, vec![]);
    assert_eq!(snapshot.generated_at_utc, "2026-08-30T00:00:00+00:00");
    assert_eq!(snapshot.observer, "geocentric (Earth center)");
    assert_eq!(snapshot.refplane, "earth");
    assert!(snapshot.objects.is_empty());
  }

  #[test]
  fn test_write_snapshot_creates_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("docs").join("feed_now.json");

    let snapshot = FeedSnapshot::new(Utc::now(), vec![sample_record()]);
    write_snapshot(&snapshot, &path).unwrap();

    let loaded: FeedSnapshot =
      serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.objects.len(), 1);
    assert_eq!(loaded.objects[0].id, "499");
    assert_eq!(loaded.objects[0].delta_au, 1.01);
  }

  #[test]
  fn test_write_snapshot_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("feed_now.json");
    fs::write(&path, "stale contents").unwrap();

    let snapshot = FeedSnapshot::new(Utc::now(), vec![]);
    write_snapshot(&snapshot, &path).unwrap();

    let loaded: FeedSnapshot =
      serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(loaded.objects.is_empty());
  }
}

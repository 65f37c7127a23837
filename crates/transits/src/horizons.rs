use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://ssd.jpl.nasa.gov";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Geocentric observer: Earth body center in Horizons site notation.
const OBSERVER_CENTER: &str = "500@399";

/// Observer-table quantities: 1 = astrometric RA/DEC, 19 = heliocentric
/// range, 20 = observer range, 23 = solar elongation, 24 = phase angle,
/// 29 = constellation, 31 = observer ecliptic lon/lat.
const QUANTITIES: &str = "1,19,20,23,24,29,31";

#[derive(Error, Debug)]
pub enum HorizonsError {
  #[error("Horizons request failed: {message}")]
  RequestFailed { message: String },

  #[error("Horizons returned status {status}")]
  BadStatus { status: u16 },

  #[error("Failed to parse Horizons response: {message}")]
  MalformedResponse { message: String },

  #[error("No ephemeris for target: {message}")]
  NoEphemeris { message: String },
}

impl HorizonsError {
  pub fn request_failed(message: impl Into<String>) -> Self {
    Self::RequestFailed { message: message.into() }
  }

  pub fn malformed_response(message: impl Into<String>) -> Self {
    Self::MalformedResponse { message: message.into() }
  }

  pub fn no_ephemeris(message: impl Into<String>) -> Self {
    Self::NoEphemeris { message: message.into() }
  }
}

/// One body's observer-table row, normalized out of the CSV block.
#[derive(Debug, Clone, PartialEq)]
pub struct Ephemeris {
  pub targetname: Option<String>,
  pub datetime_str: String,
  pub ra_deg: f64,
  pub dec_deg: f64,
  pub delta_au: f64,
  pub r_au: f64,
  pub ecl_lon_deg: f64,
  pub ecl_lat_deg: f64,
  pub elong_deg: Option<f64>,
  pub phase_angle_deg: Option<f64>,
  pub constellation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
  #[serde(default)]
  result: Option<String>,
  #[serde(default)]
  error: Option<String>,
}

/// Client for the Horizons API (`/api/horizons.api`).
///
/// One GET per target; the shared reqwest client carries a fixed
/// per-request timeout so an unresponsive target cannot hang the run.
pub struct Client {
  http: reqwest::Client,
  base_url: String,
}

impl Client {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HorizonsError> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| HorizonsError::request_failed(format!("failed to build client: {e}")))?;

    Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
  }

  /// Query the geocentric observer table for `command` at the single
  /// epoch `epoch_jd` (Julian date, UT).
  pub async fn query(&self, command: &str, epoch_jd: f64) -> Result<Ephemeris, HorizonsError> {
    let url = format!("{}/api/horizons.api", self.base_url);

    let response = self
      .http
      .get(&url)
      .query(&[
        ("format", "json"),
        ("COMMAND", &format!("'{command}'")),
        ("OBJ_DATA", "NO"),
        ("MAKE_EPHEM", "YES"),
        ("EPHEM_TYPE", "OBSERVER"),
        ("CENTER", &format!("'{OBSERVER_CENTER}'")),
        ("TLIST", &format!("'{epoch_jd}'")),
        ("TLIST_TYPE", "JD"),
        ("QUANTITIES", &format!("'{QUANTITIES}'")),
        ("CSV_FORMAT", "YES"),
        ("ANG_FORMAT", "DEG"),
      ])
      .send()
      .await
      .map_err(|e| HorizonsError::request_failed(e.to_string()))?;

    if !response.status().is_success() {
      return Err(HorizonsError::BadStatus { status: response.status().as_u16() });
    }

    let envelope: ApiEnvelope = response
      .json()
      .await
      .map_err(|e| HorizonsError::malformed_response(format!("invalid JSON envelope: {e}")))?;

    if let Some(message) = envelope.error {
      return Err(HorizonsError::no_ephemeris(message));
    }

    let result = envelope
      .result
      .ok_or_else(|| HorizonsError::malformed_response("envelope has no result field"))?;

    parse_observer_table(&result)
  }
}

/// Julian date of `when` (UT).
pub fn julian_date(when: DateTime<Utc>) -> f64 {
  when.timestamp_millis() as f64 / 86_400_000.0 + 2_440_587.5
}

/// Parse the text ephemeris inside a Horizons result: a CSV header row,
/// then a `$$SOE`/`$$EOE` delimited data block with one row per epoch.
pub fn parse_observer_table(result: &str) -> Result<Ephemeris, HorizonsError> {
  let lines: Vec<&str> = result.lines().collect();

  let soe = lines.iter().position(|l| l.trim() == "$$SOE").ok_or_else(|| {
    // Unknown designations come back as prose, not a table.
    let hint = lines
      .iter()
      .map(|l| l.trim())
      .find(|l| l.contains("No matches found") || l.contains("Cannot interpret"))
      .unwrap_or("result has no $$SOE block");
    HorizonsError::no_ephemeris(hint)
  })?;

  let header_line = lines[..soe]
    .iter()
    .rev()
    .find(|l| l.contains(','))
    .ok_or_else(|| HorizonsError::malformed_response("no CSV header row before $$SOE"))?;

  let row_line = lines[soe + 1..]
    .iter()
    .take_while(|l| l.trim() != "$$EOE")
    .find(|l| !l.trim().is_empty())
    .ok_or_else(|| HorizonsError::no_ephemeris("empty ephemeris block"))?;

  let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();
  let fields: Vec<&str> = row_line.split(',').map(str::trim).collect();

  // Horizons varies header spellings across output modes; the candidate
  // families below cover the ones the feed has seen in practice.
  let ra_deg = required_field(&headers, &fields, "RA", &["R.A.", "RA"], &["R.A._"])?;
  let dec_deg = required_field(&headers, &fields, "DEC", &["DEC", "Dec"], &["DEC_", "Dec_"])?;
  let delta_au = required_field(&headers, &fields, "delta", &["delta"], &[])?;
  let r_au = required_field(&headers, &fields, "r", &["r"], &[])?;
  let ecl_lon_deg =
    required_field(&headers, &fields, "ObsEcLon", &["ObsEcLon", "EclLon", "ELON"], &["ObsEclLon"])?;
  let ecl_lat_deg =
    required_field(&headers, &fields, "ObsEcLat", &["ObsEcLat", "EclLat", "ELAT"], &["ObsEclLat"])?;

  let elong_deg = field_value(&headers, &fields, &["S-O-T"], &[]).and_then(parse_float);
  let phase_angle_deg = field_value(&headers, &fields, &["S-T-O"], &[]).and_then(parse_float);
  let constellation = field_value(&headers, &fields, &["Cnst"], &[])
    .filter(|v| !v.is_empty() && *v != "n.a.")
    .map(str::to_string);

  let datetime_str = fields.first().map(|f| f.to_string()).unwrap_or_default();

  let targetname = lines
    .iter()
    .find(|l| l.trim_start().starts_with("Target body name:"))
    .map(|l| {
      let after = l.splitn(2, ':').nth(1).unwrap_or("");
      // Strip the trailing "{source: ...}" annotation.
      after.split('{').next().unwrap_or("").trim().to_string()
    })
    .filter(|name| !name.is_empty());

  Ok(Ephemeris {
    targetname,
    datetime_str,
    ra_deg,
    dec_deg,
    delta_au,
    r_au,
    ecl_lon_deg,
    ecl_lat_deg,
    elong_deg,
    phase_angle_deg,
    constellation,
  })
}

/// Look up a data field by header name: exact candidates first, then
/// prefix candidates (kept long enough not to collide with `r`/`rdot`
/// style short names).
fn field_value<'a>(
  headers: &[&str],
  fields: &[&'a str],
  exact: &[&str],
  prefixes: &[&str],
) -> Option<&'a str> {
  let idx = headers
    .iter()
    .position(|h| exact.contains(h) || prefixes.iter().any(|p| h.starts_with(p)))?;
  fields.get(idx).copied()
}

fn required_field(
  headers: &[&str],
  fields: &[&str],
  name: &str,
  exact: &[&str],
  prefixes: &[&str],
) -> Result<f64, HorizonsError> {
  let raw = field_value(headers, fields, exact, prefixes)
    .ok_or_else(|| HorizonsError::malformed_response(format!("missing column: {name}")))?;
  parse_float(raw)
    .ok_or_else(|| HorizonsError::malformed_response(format!("bad value for {name}: '{raw}'")))
}

fn parse_float(raw: &str) -> Option<f64> {
  match raw {
    "" | "n.a." => None,
    _ => raw.parse().ok(),
  }
}

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Target list not found at '{path}'")]
  NotFound { path: String },

  #[error("Failed to read target list '{path}': {message}")]
  Unreadable { path: String, message: String },

  #[error("Malformed target list '{path}': {message}")]
  Malformed { path: String, message: String },
}

impl ConfigError {
  pub fn not_found(path: impl Into<String>) -> Self {
    Self::NotFound { path: path.into() }
  }

  pub fn unreadable(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Unreadable { path: path.into(), message: message.into() }
  }

  pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Malformed { path: path.into(), message: message.into() }
  }
}

/// A body to query, as resolved from the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
  /// Horizons designation: a record number ("399"), name ("Sun"), or
  /// small-body designation.
  pub id: String,
  /// Display label; defaults to the id when the config doesn't give one.
  pub label: String,
}

/// Config file shapes accepted for the target list.
///
/// Both the bare-array form and the `{"targets": [...]}` wrapper are in
/// the wild, so both parse.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetsFile {
  Bare(Vec<TargetEntry>),
  Keyed { targets: Vec<TargetEntry> },
}

/// One entry in the target list: a bare string, a bare number, or an
/// object with an id and optional label.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetEntry {
  Name(String),
  Number(serde_json::Number),
  Object {
    id: serde_json::Value,
    #[serde(default)]
    label: Option<String>,
  },
}

impl TargetEntry {
  fn into_target(self) -> Result<Target, String> {
    match self {
      TargetEntry::Name(id) => Ok(Target { label: id.clone(), id }),
      TargetEntry::Number(n) => {
        let id = n.to_string();
        Ok(Target { label: id.clone(), id })
      }
      TargetEntry::Object { id, label } => {
        let id = match id {
          serde_json::Value::String(s) => s,
          serde_json::Value::Number(n) => n.to_string(),
          other => return Err(format!("target id must be a string or number, got {other}")),
        };
        Ok(Target { label: label.unwrap_or_else(|| id.clone()), id })
      }
    }
  }
}

/// Load the target list from `path`.
///
/// A missing or malformed file is a hard error; an empty list is valid
/// and yields an empty feed downstream.
pub fn load_targets(path: &Path) -> Result<Vec<Target>, ConfigError> {
  let display = path.display().to_string();

  if !path.exists() {
    return Err(ConfigError::not_found(display));
  }

  let raw =
    fs::read_to_string(path).map_err(|e| ConfigError::unreadable(&display, e.to_string()))?;

  let parsed: TargetsFile =
    serde_json::from_str(&raw).map_err(|e| ConfigError::malformed(&display, e.to_string()))?;

  let entries = match parsed {
    TargetsFile::Bare(entries) | TargetsFile::Keyed { targets: entries } => entries,
  };

  entries
    .into_iter()
    .map(|entry| entry.into_target().map_err(|msg| ConfigError::malformed(&display, msg)))
    .collect()
}

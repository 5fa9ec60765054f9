//! CLI configuration, loaded from a TOML file with `PATRON_*` environment
//! overrides.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Path to the SQLite database file.
  pub store_path: PathBuf,

  /// Capacity of the queue between the engine and the audit writer task.
  pub audit_queue_depth: usize,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path:        PathBuf::from("patron.db"),
      audit_queue_depth: 256,
    }
  }
}

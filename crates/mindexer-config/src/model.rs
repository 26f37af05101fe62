use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[fs]` — file-tree-walk tuning, shared by every plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
  /// Extra local roots to scan besides whatever `STORAGE_DEVS` provides.
  #[serde(default)]
  pub roots: Vec<PathBuf>,
  #[serde(default = "default_ignore_hidden")]
  pub ignore_hidden: bool,
  #[serde(default = "default_max_depth")]
  pub max_depth: u32,
}

fn default_ignore_hidden() -> bool {
  true
}

fn default_max_depth() -> u32 {
  64
}

impl Default for FsConfig {
  fn default() -> Self {
    Self { roots: Vec::new(), ignore_hidden: default_ignore_hidden(), max_depth: default_max_depth() }
  }
}

/// `[extract]` — metadata extraction pool tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
  #[serde(default = "default_n_parallel_meta")]
  pub n_parallel_meta: usize,
  #[serde(default)]
  pub force_sw_decoders: bool,
}

fn default_n_parallel_meta() -> usize {
  4
}

impl Default for ExtractConfig {
  fn default() -> Self {
    Self { n_parallel_meta: default_n_parallel_meta(), force_sw_decoders: false }
  }
}

/// `[db]` — the external document database connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
  #[serde(default = "default_db_url")]
  pub base_url: String,
  #[serde(default = "default_flush_count")]
  pub flush_count: usize,
  #[serde(default = "default_timeout_secs")]
  pub request_timeout_secs: u64,
}

fn default_db_url() -> String {
  "http://localhost:9091".to_string()
}

fn default_flush_count() -> usize {
  100
}

fn default_timeout_secs() -> u64 {
  10
}

impl Default for DbConfig {
  fn default() -> Self {
    Self {
      base_url: default_db_url(),
      flush_count: default_flush_count(),
      request_timeout_secs: default_timeout_secs(),
    }
  }
}

/// `[storage]` — the local device/settings SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
  pub db_filename: Option<String>,
  #[serde(default = "default_journal_mode")]
  pub journal_mode: String,
}

fn default_journal_mode() -> String {
  "WAL".to_string()
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self { db_filename: None, journal_mode: default_journal_mode() }
  }
}

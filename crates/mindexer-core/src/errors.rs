use thiserror::Error;

/// Errors that cross a port boundary within the core. Infrastructure crates
/// map their own error types onto this enum rather than leaking their
/// internals into `mindexer-core`.
#[derive(Debug, Error)]
pub enum CoreError {
  #[error("scan error: {0}")]
  Scan(String),

  #[error("extract error: {0}")]
  Extract(String),

  #[error("db error: {0}")]
  Db(String),

  #[error("cache error: {0}")]
  Cache(String),

  #[error("config error: {0}")]
  Config(String),

  #[error("not found")]
  NotFound,
}

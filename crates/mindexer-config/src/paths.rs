use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("toml decode error: {0}")]
  TomlDe(#[from] toml::de::Error),
  #[error("toml encode error: {0}")]
  TomlSer(#[from] toml::ser::Error),
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
  #[error("could not determine a base directory for this platform")]
  Directories,
  #[error("{0}")]
  Other(String),
}

/// Resolved set of on-disk locations the whole process shares.
///
/// Overridable as a whole via `MINDEXER_BASE_DIR`, which is how tests and the
/// sample scenarios in the integration suite get a hermetic directory tree.
#[derive(Debug, Clone)]
pub struct Paths {
  pub base_dir: PathBuf,
  pub config_dir: PathBuf,
  pub data_dir: PathBuf,
  pub cache_dir: PathBuf,
}

impl Paths {
  pub fn detect() -> Result<Self, ConfigError> {
    let (base_dir, config_dir, data_dir, cache_dir);

    if let Ok(env_base) = std::env::var("MINDEXER_BASE_DIR") {
      let base = PathBuf::from(env_base);
      base_dir = base.clone();
      config_dir = base.join("config");
      data_dir = base.join("data");
      cache_dir = base.join("cache");
    } else {
      let proj_dirs =
        ProjectDirs::from("com", "mindexer", "mindexer").ok_or(ConfigError::Directories)?;
      base_dir = proj_dirs.config_dir().to_path_buf();
      config_dir = proj_dirs.config_dir().to_path_buf();
      data_dir = proj_dirs.data_dir().to_path_buf();
      cache_dir = proj_dirs.cache_dir().to_path_buf();
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::create_dir_all(&data_dir)?;
    std::fs::create_dir_all(&cache_dir)?;

    Ok(Self { base_dir, config_dir, data_dir, cache_dir })
  }

  pub fn config_file(&self) -> PathBuf {
    self.config_dir.join("mindexer.toml")
  }

  pub fn extensions_file(&self) -> PathBuf {
    self.config_dir.join("extensions.json")
  }

  /// `<cache_dir>/<device_uuid>/cache.json`
  pub fn device_cache_file(&self, device_uuid: &str) -> PathBuf {
    self.cache_dir.join(device_uuid).join("cache.json")
  }

  /// `<data_dir>/thumbnails/<device_uuid>`
  pub fn thumbnail_dir(&self, device_uuid: &str) -> PathBuf {
    self.data_dir.join("thumbnails").join(device_uuid)
  }

  /// `<data_dir>/thumbnails/<device_uuid>/<name>`
  pub fn thumbnail_path(&self, device_uuid: &str, name: &str) -> PathBuf {
    self.thumbnail_dir(device_uuid).join(name)
  }

  pub fn local_store_file(&self) -> PathBuf {
    self.data_dir.join("mindexer.sqlite")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  struct EnvVarGuard {
    key: String,
    original: Option<String>,
  }

  impl EnvVarGuard {
    fn new(key: &str, value: &str) -> Self {
      let original = std::env::var(key).ok();
      unsafe { std::env::set_var(key, value) };
      EnvVarGuard { key: key.to_owned(), original }
    }
  }

  impl Drop for EnvVarGuard {
    fn drop(&mut self) {
      match &self.original {
        Some(val) => unsafe { std::env::set_var(&self.key, val) },
        None => unsafe { std::env::remove_var(&self.key) },
      }
    }
  }

  #[test]
  fn base_dir_override_creates_the_full_tree() {
    let tmp = tempdir().unwrap();
    let _env = EnvVarGuard::new("MINDEXER_BASE_DIR", tmp.path().to_str().unwrap());

    let paths = Paths::detect().unwrap();

    assert_eq!(paths.base_dir, tmp.path());
    assert_eq!(paths.config_dir, tmp.path().join("config"));
    assert_eq!(paths.data_dir, tmp.path().join("data"));
    assert_eq!(paths.cache_dir, tmp.path().join("cache"));
    assert!(paths.config_dir.exists());
    assert!(paths.data_dir.exists());
    assert!(paths.cache_dir.exists());
  }

  #[test]
  fn device_cache_file_is_namespaced_by_uuid() {
    let tmp = tempdir().unwrap();
    let _env = EnvVarGuard::new("MINDEXER_BASE_DIR", tmp.path().to_str().unwrap());
    let paths = Paths::detect().unwrap();

    assert_eq!(paths.device_cache_file("abc"), tmp.path().join("cache/abc/cache.json"));
  }
}

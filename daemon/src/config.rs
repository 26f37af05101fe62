use anyhow::Context;
use mindexer_config::{ConfigBackend, DbConfig, ExtractConfig, FsConfig, StorageConfig, CONFIG_BACKEND};
use std::path::Path;

/// The four ambient sections every run needs, resolved either from the
/// well-known config file or from an explicit `--config` override.
pub struct AppConfig {
  pub fs: FsConfig,
  pub extract: ExtractConfig,
  pub db: DbConfig,
  pub storage: StorageConfig,
}

impl AppConfig {
  pub fn load(override_path: Option<&Path>) -> anyhow::Result<Self> {
    match override_path {
      Some(path) => Self::load_from_file(path),
      None => Ok(Self {
        fs: CONFIG_BACKEND.load_section("fs")?,
        extract: CONFIG_BACKEND.load_section("extract")?,
        db: CONFIG_BACKEND.load_section("db")?,
        storage: CONFIG_BACKEND.load_section("storage")?,
      }),
    }
  }

  fn load_from_file(path: &Path) -> anyhow::Result<Self> {
    let content =
      std::fs::read_to_string(path).with_context(|| format!("reading config file '{}'", path.display()))?;
    let toml_val: toml::Value =
      toml::from_str(&content).with_context(|| format!("parsing config file '{}'", path.display()))?;

    Ok(Self {
      fs: section(&toml_val, "fs")?,
      extract: section(&toml_val, "extract")?,
      db: section(&toml_val, "db")?,
      storage: section(&toml_val, "storage")?,
    })
  }
}

fn section<T: serde::de::DeserializeOwned + Default>(doc: &toml::Value, name: &str) -> anyhow::Result<T> {
  match doc.get(name) {
    Some(table) => Ok(table.clone().try_into()?),
    None => Ok(T::default()),
  }
}

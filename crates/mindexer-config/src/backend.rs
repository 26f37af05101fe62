use crate::paths::{ConfigError, Paths};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use toml_edit::{DocumentMut, Item};

pub trait ConfigBackend {
  /// Loads a named section, falling back to `T::default()` if the config
  /// file or the section itself is absent.
  fn load_section<T>(&self, section: &str) -> Result<T, ConfigError>
  where
    T: DeserializeOwned + Default;

  /// Writes a named section back, preserving comments and the layout of
  /// every other section in the file.
  fn save_section<T: Serialize>(&self, section: &str, value: &T) -> Result<(), ConfigError>;
}

pub struct TomlConfigBackend {
  paths: Paths,
}

impl TomlConfigBackend {
  pub fn new(paths: Paths) -> Self {
    Self { paths }
  }
}

impl ConfigBackend for TomlConfigBackend {
  fn load_section<T>(&self, section: &str) -> Result<T, ConfigError>
  where
    T: DeserializeOwned + Default,
  {
    let path = self.paths.config_file();

    let content = match fs::read_to_string(&path) {
      Ok(c) => c,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
      Err(e) => return Err(e.into()),
    };

    let toml_val: toml::Value = toml::from_str(&content)?;

    let Some(table) = toml_val.get(section) else {
      return Ok(T::default());
    };

    let t: T = table
      .clone()
      .try_into()
      .map_err(|e| ConfigError::Other(format!("decode section [{section}]: {e}")))?;

    Ok(t)
  }

  fn save_section<T: Serialize>(&self, section: &str, value: &T) -> Result<(), ConfigError> {
    let path = self.paths.config_file();

    let mut doc: DocumentMut = match fs::read_to_string(&path) {
      Ok(content) => content
        .parse::<DocumentMut>()
        .map_err(|e| ConfigError::Other(format!("parse toml document: {e}")))?,
      Err(e) if e.kind() == ErrorKind::NotFound => DocumentMut::new(),
      Err(e) => return Err(e.into()),
    };

    let section_str = toml::to_string(value)?;

    let section_item: Item = section_str
      .parse::<DocumentMut>()
      .map_err(|e| ConfigError::Other(format!("parse section as document: {e}")))?
      .into_item();

    doc[section] = section_item;

    mindexer_fs::atomic_write_str(&path, &doc.to_string())?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
  struct Section {
    n: u32,
  }

  #[test]
  fn save_then_load_round_trips_a_section() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = Paths {
      base_dir: tmp.path().to_path_buf(),
      config_dir: tmp.path().to_path_buf(),
      data_dir: tmp.path().to_path_buf(),
      cache_dir: tmp.path().to_path_buf(),
    };
    let backend = TomlConfigBackend::new(paths);

    backend.save_section("extract", &Section { n: 4 }).unwrap();
    let loaded: Section = backend.load_section("extract").unwrap();

    assert_eq!(loaded, Section { n: 4 });
  }

  #[test]
  fn missing_section_falls_back_to_default() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = Paths {
      base_dir: tmp.path().to_path_buf(),
      config_dir: tmp.path().to_path_buf(),
      data_dir: tmp.path().to_path_buf(),
      cache_dir: tmp.path().to_path_buf(),
    };
    let backend = TomlConfigBackend::new(paths);

    let loaded: Section = backend.load_section("absent").unwrap();
    assert_eq!(loaded, Section::default());
  }
}

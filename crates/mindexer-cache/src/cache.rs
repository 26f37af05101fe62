use mindexer_core::MediaType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("malformed cache file: {0}")]
  Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
  pub fingerprint: u64,
  pub media_type: MediaType,
  pub thumbnail_name: String,
}

/// On-disk shape: four parallel arrays, one element per record, index-aligned.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
  uri: Vec<String>,
  hash: Vec<u64>,
  #[serde(rename = "type")]
  kind: Vec<String>,
  thumbnail: Vec<String>,
}

fn media_type_tag(t: MediaType) -> &'static str {
  match t {
    MediaType::Audio => "audio",
    MediaType::Video => "video",
    MediaType::Image => "image",
  }
}

fn media_type_from_tag(tag: &str) -> Result<MediaType, CacheError> {
  match tag {
    "audio" => Ok(MediaType::Audio),
    "video" => Ok(MediaType::Video),
    "image" => Ok(MediaType::Image),
    other => Err(CacheError::Malformed(format!("unknown type tag `{other}`"))),
  }
}

/// Per-device record of what a previous scan found. `loaded` holds what was
/// read from disk at scan start; a walk probes it entry by entry, moving hits
/// into `built`. Whatever is left in `loaded` once the walk finishes is no
/// longer present on the device and should be deleted from the database.
#[derive(Debug, Default)]
pub struct Cache {
  loaded: HashMap<String, CacheRecord>,
  built: HashMap<String, CacheRecord>,
}

impl Cache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reads a cache file from a previous scan. A parse failure (missing
  /// array, length mismatch) is reported rather than silently dropped, so
  /// the caller can decide to fall back to a cold walk.
  pub fn load(path: &Path) -> Result<Self, CacheError> {
    let content = std::fs::read_to_string(path)?;
    let file: CacheFile = serde_json::from_str(&content)
      .map_err(|e| CacheError::Malformed(format!("invalid json: {e}")))?;

    if file.uri.len() != file.hash.len() || file.uri.len() != file.kind.len() || file.uri.len() != file.thumbnail.len() {
      return Err(CacheError::Malformed("array length mismatch across uri/hash/type/thumbnail".into()));
    }

    let mut loaded = HashMap::with_capacity(file.uri.len());
    for i in 0..file.uri.len() {
      let media_type = media_type_from_tag(&file.kind[i])?;
      loaded.insert(
        file.uri[i].clone(),
        CacheRecord { fingerprint: file.hash[i], media_type, thumbnail_name: file.thumbnail[i].clone() },
      );
    }

    Ok(Self { loaded, built: HashMap::new() })
  }

  /// Checks whether `uri` is unchanged from the prior scan. On a hit, the
  /// record moves from `loaded` into `built` — this is the "probed" step
  /// that keeps `loaded`'s residue limited to files no longer present.
  pub fn probe(&mut self, uri: &str, fingerprint: u64) -> bool {
    match self.loaded.get(uri) {
      Some(record) if record.fingerprint == fingerprint => {
        let record = self.loaded.remove(uri).unwrap();
        self.built.insert(uri.to_string(), record);
        true
      }
      _ => false,
    }
  }

  /// Records a freshly discovered (or re-extracted) item.
  pub fn insert(&mut self, uri: impl Into<String>, record: CacheRecord) {
    self.built.insert(uri.into(), record);
  }

  /// Items present in the last persisted cache that were never probed this
  /// walk — no longer on the device, and due for deletion.
  pub fn residue(&self) -> impl Iterator<Item = (&str, &CacheRecord)> {
    self.loaded.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn built_len(&self) -> usize {
    self.built.len()
  }

  /// Serializes `built` as the four-array JSON document and writes it
  /// atomically, then clears `built` (the next scan starts from whatever
  /// gets read back via `load`).
  pub fn persist(&mut self, path: &Path) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let mut file = CacheFile { uri: Vec::new(), hash: Vec::new(), kind: Vec::new(), thumbnail: Vec::new() };
    for (uri, record) in &self.built {
      file.uri.push(uri.clone());
      file.hash.push(record.fingerprint);
      file.kind.push(media_type_tag(record.media_type).to_string());
      file.thumbnail.push(record.thumbnail_name.clone());
    }

    let serialized = serde_json::to_string(&file).map_err(|e| CacheError::Malformed(e.to_string()))?;
    mindexer_fs::atomic_write_str(path, &serialized)?;
    self.built.clear();
    Ok(())
  }

  pub fn reset(&mut self) {
    self.loaded.clear();
    self.built.clear();
  }
}

pub(crate) fn cache_dir_for(uuid: &str, root: &Path) -> PathBuf {
  root.join(uuid)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn probe_moves_matching_entries_from_loaded_to_built() {
    let mut cache = Cache::default();
    cache.loaded.insert(
      "storage:///a.mp3".into(),
      CacheRecord { fingerprint: 42, media_type: MediaType::Audio, thumbnail_name: "t.jpg".into() },
    );

    assert!(cache.probe("storage:///a.mp3", 42));
    assert_eq!(cache.residue().count(), 0);
    assert_eq!(cache.built_len(), 1);
  }

  #[test]
  fn probe_rejects_changed_fingerprint_and_leaves_loaded_intact() {
    let mut cache = Cache::default();
    cache.loaded.insert(
      "storage:///a.mp3".into(),
      CacheRecord { fingerprint: 42, media_type: MediaType::Audio, thumbnail_name: "t.jpg".into() },
    );

    assert!(!cache.probe("storage:///a.mp3", 99));
    assert_eq!(cache.residue().count(), 1);
  }

  #[test]
  fn persist_then_load_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cache.json");

    let mut cache = Cache::new();
    cache.insert(
      "storage:///a.jpg",
      CacheRecord { fingerprint: 7, media_type: MediaType::Image, thumbnail_name: "thumb.jpg".into() },
    );
    cache.persist(&path).unwrap();
    assert_eq!(cache.built_len(), 0);

    let reloaded = Cache::load(&path).unwrap();
    assert!(reloaded.loaded.contains_key("storage:///a.jpg"));
  }

  #[test]
  fn load_rejects_mismatched_array_lengths() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cache.json");
    std::fs::write(&path, r#"{"uri":["a"],"hash":[],"type":["audio"],"thumbnail":["x"]}"#).unwrap();

    assert!(Cache::load(&path).is_err());
  }
}

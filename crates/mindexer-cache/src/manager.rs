use crate::cache::{Cache, CacheError};
use mindexer_config::PATHS;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Process-wide registry of per-device caches, keyed by device uri. A single
/// mutex serializes creation/destruction of entries; the individual `Cache`
/// values are independently locked so one device's walk never blocks
/// another's.
pub struct CacheManager {
  caches: Mutex<HashMap<String, Arc<Mutex<Cache>>>>,
}

impl CacheManager {
  fn new() -> Self {
    Self { caches: Mutex::new(HashMap::new()) }
  }

  pub fn cache_path(&self, uuid: &str) -> PathBuf {
    PATHS.device_cache_file(uuid)
  }

  /// Returns the cache for `device_uri`, creating an empty one if none is
  /// registered yet.
  pub fn get_or_create(&self, device_uri: &str) -> Arc<Mutex<Cache>> {
    let mut caches = self.caches.lock().unwrap();
    caches.entry(device_uri.to_string()).or_insert_with(|| Arc::new(Mutex::new(Cache::new()))).clone()
  }

  /// Attempts to read a prior scan's cache file for `device_uri` and
  /// registers it. A parse failure (or missing file) returns the error to
  /// the caller, which is expected to fall back to a cold walk — it is not
  /// treated as fatal here.
  pub fn read_cache(&self, device_uri: &str, uuid: &str) -> Result<Arc<Mutex<Cache>>, CacheError> {
    let path = self.cache_path(uuid);
    let cache = Cache::load(&path)?;
    let handle = Arc::new(Mutex::new(cache));
    self.caches.lock().unwrap().insert(device_uri.to_string(), handle.clone());
    Ok(handle)
  }

  pub fn generate_cache_file(&self, device_uri: &str, uuid: &str) -> Result<(), CacheError> {
    let handle = self.get_or_create(device_uri);
    let path = self.cache_path(uuid);
    handle.lock().unwrap().persist(&path)
  }

  pub fn reset_cache(&self, device_uri: &str) {
    if let Some(handle) = self.caches.lock().unwrap().get(device_uri) {
      handle.lock().unwrap().reset();
    }
  }

  pub fn reset_all(&self) {
    for handle in self.caches.lock().unwrap().values() {
      handle.lock().unwrap().reset();
    }
  }
}

pub static CACHE_MANAGER: once_cell::sync::Lazy<CacheManager> = once_cell::sync::Lazy::new(CacheManager::new);

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheRecord;
  use mindexer_core::MediaType;

  #[test]
  fn get_or_create_returns_the_same_handle_for_a_device() {
    let mgr = CacheManager::new();
    let a = mgr.get_or_create("storage:///mnt/x");
    a.lock().unwrap().insert(
      "storage:///mnt/x/f.mp3",
      CacheRecord { fingerprint: 1, media_type: MediaType::Audio, thumbnail_name: "t.jpg".into() },
    );

    let b = mgr.get_or_create("storage:///mnt/x");
    assert_eq!(b.lock().unwrap().built_len(), 1);
  }
}

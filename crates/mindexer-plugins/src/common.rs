use futures::StreamExt;
use mindexer_cache::CACHE_MANAGER;
use mindexer_config::{Configurator, PATHS};
use mindexer_core::ports::{DeviceObserver, MediaItemObserver};
use mindexer_core::{CoreError, Device, DeviceMeta, MediaItem};
use mindexer_fs::async_walker::{walk, WalkConfig};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::UNIX_EPOCH;

fn is_hidden(path: &std::path::Path) -> bool {
  path.to_string_lossy().contains("/.")
}

fn extension_of(path: &std::path::Path) -> Option<String> {
  path.extension().and_then(|e| e.to_str()).map(str::to_owned)
}

/// A file's last-modified time, in nanoseconds since the epoch, used as the
/// cheap change-detection fingerprint a rescan probes against the cache.
fn fingerprint_of(metadata: &std::fs::Metadata) -> u64 {
  metadata.modified().ok().and_then(|t| t.duration_since(UNIX_EPOCH).ok()).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

/// Shared device bookkeeping and file-tree-walk algorithm every concrete
/// plugin delegates to. Each plugin owns one of these and layers its own
/// device-discovery mechanism (hot-plug callback, static list, SSDP stub) on
/// top.
pub struct PluginCore {
  scheme: &'static str,
  devices: RwLock<HashMap<String, Arc<Device>>>,
  configurator: Arc<Configurator>,
  observer: Arc<dyn DeviceObserver>,
}

impl PluginCore {
  pub fn new(scheme: &'static str, configurator: Arc<Configurator>, observer: Arc<dyn DeviceObserver>) -> Self {
    Self { scheme, devices: RwLock::new(HashMap::new()), configurator, observer }
  }

  pub fn scheme(&self) -> &'static str {
    self.scheme
  }

  pub fn devices(&self) -> Vec<Arc<Device>> {
    self.devices.read().unwrap().values().cloned().collect()
  }

  pub fn get(&self, uri: &str) -> Option<Arc<Device>> {
    self.devices.read().unwrap().get(uri).cloned()
  }

  /// Finds the device owning `item_uri` by longest-prefix match — an item's
  /// uri is always `<device_uri><relative path>`.
  pub fn find_owning_device(&self, item_uri: &str) -> Option<Arc<Device>> {
    self.devices.read().unwrap().values().find(|d| item_uri.starts_with(d.uri.as_str())).cloned()
  }

  /// Registers a device unconditionally, e.g. replaying one persisted by
  /// `mindexer-db` at startup. Returns whether it was new.
  pub fn inject_device(&self, device: Arc<Device>) -> bool {
    let is_new = {
      let mut devices = self.devices.write().unwrap();
      if devices.contains_key(&device.uri) {
        false
      } else {
        devices.insert(device.uri.clone(), device);
        true
      }
    };
    if is_new {
      self.observer.notify_device_list();
    }
    is_new
  }

  /// Adds or reactivates a device, notifying on any change. Returns the
  /// device.
  pub fn add_device(&self, uri: &str, mountpoint: &str, uuid: &str) -> Arc<Device> {
    let (device, changed) = {
      let mut devices = self.devices.write().unwrap();
      if let Some(existing) = devices.get(uri) {
        existing.set_mountpoint(mountpoint);
        let changed = existing.set_available(true);
        (existing.clone(), changed)
      } else {
        let device = Arc::new(Device::new(uri, mountpoint, uuid));
        devices.insert(uri.to_string(), device.clone());
        (device, true)
      }
    };
    if changed {
      self.observer.notify_device_list();
    }
    device
  }

  /// Marks a device unavailable, notifying if availability actually changed.
  /// Returns the device, if known.
  pub fn remove_device(&self, uri: &str) -> Option<Arc<Device>> {
    let device = self.get(uri)?;
    if device.set_available(false) {
      self.observer.notify_device_list();
    }
    Some(device)
  }

  pub fn set_meta(&self, uri: &str, meta: DeviceMeta) -> Option<Arc<Device>> {
    let device = self.get(uri)?;
    device.set_meta(meta);
    self.observer.notify_device_list();
    Some(device)
  }

  /// Poll-mode liveness sweep. Notifies once if any device's availability
  /// flipped.
  pub fn check_devices(&self) {
    let expired: Vec<_> =
      self.devices.read().unwrap().values().filter(|d| !d.check_alive() && d.set_available(false)).cloned().collect();
    if !expired.is_empty() {
      self.observer.notify_device_list();
    }
  }

  /// Walks `uri`'s mountpoint (cold walk for a newly mounted device, warm
  /// walk against a cached manifest otherwise) and reports every
  /// discovered/retired item to `observer`.
  pub async fn scan(&self, uri: &str, observer: Arc<dyn MediaItemObserver>) -> Result<(), CoreError> {
    let device = self.get(uri).ok_or(CoreError::NotFound)?;
    let mountpoint = device.mountpoint();
    if mountpoint.is_empty() {
      return Err(CoreError::Scan(format!("device '{uri}' has no mountpoint")));
    }

    device.begin_scan();
    let result = if device.new_mounted() { self.cold_walk(&device, &observer).await } else { self.warm_walk(&device, &observer).await };
    device.begin_parsing();
    result
  }

  async fn cold_walk(&self, device: &Arc<Device>, observer: &Arc<dyn MediaItemObserver>) -> Result<(), CoreError> {
    let cache = CACHE_MANAGER.get_or_create(&device.uri);

    let entries = walk(device.mountpoint(), WalkConfig::default());
    tokio::pin!(entries);

    while let Some(entry) = entries.next().await {
      let entry = match entry {
        Ok(e) => e,
        Err(e) => {
          tracing::warn!("walk error under '{}': {e}", device.mountpoint());
          continue;
        }
      };
      if !entry.file_type.is_file() || is_hidden(&entry.path) {
        continue;
      }

      let Some(item) = self.build_item(device, &entry.path).await else { continue };
      cache.lock().unwrap().insert(
        item.uri.clone(),
        mindexer_cache::CacheRecord { fingerprint: item.fingerprint, media_type: item.media_type, thumbnail_name: item.thumbnail_name.clone() },
      );
      device.increment_discovered(item.media_type);
      observer.new_media_item(item).await;
    }

    let persisted = cache.lock().unwrap().persist(&CACHE_MANAGER.cache_path(&device.uuid));
    persisted.map_err(|e| CoreError::Cache(e.to_string()))?;
    tracing::info!("cold file-tree-walk on '{}' completed", device.uri);
    Ok(())
  }

  async fn warm_walk(&self, device: &Arc<Device>, observer: &Arc<dyn MediaItemObserver>) -> Result<(), CoreError> {
    let cache = match CACHE_MANAGER.read_cache(&device.uri, &device.uuid) {
      Ok(cache) => cache,
      Err(e) => {
        tracing::warn!("failed to read cache for '{}' ({e}), falling back to a cold walk", device.uri);
        return self.cold_walk(device, observer).await;
      }
    };

    let entries = walk(device.mountpoint(), WalkConfig::default());
    tokio::pin!(entries);

    while let Some(entry) = entries.next().await {
      let entry = match entry {
        Ok(e) => e,
        Err(e) => {
          tracing::warn!("walk error under '{}': {e}", device.mountpoint());
          continue;
        }
      };
      if !entry.file_type.is_file() || is_hidden(&entry.path) {
        continue;
      }

      let Some((media_type, fingerprint)) = self.peek_item(&entry.path).await else { continue };
      let item_uri = self.item_uri(device, &entry.path);
      if cache.lock().unwrap().probe(&item_uri, fingerprint) {
        device.increment_discovered(media_type);
        observer.confirm_unchanged_item(device.uri.clone(), item_uri, media_type).await;
        continue;
      }

      let Some(item) = self.build_item(device, &entry.path).await else { continue };
      cache.lock().unwrap().insert(
        item.uri.clone(),
        mindexer_cache::CacheRecord { fingerprint: item.fingerprint, media_type: item.media_type, thumbnail_name: item.thumbnail_name.clone() },
      );
      device.increment_discovered(item.media_type);
      observer.new_media_item(item).await;
    }

    let residue: Vec<_> = cache.lock().unwrap().residue().map(|(uri, record)| (uri.to_string(), record.clone())).collect();
    for (uri, record) in residue {
      let thumb_path = PATHS.thumbnail_path(&device.uuid, &record.thumbnail_name);
      let _ = tokio::fs::remove_file(&thumb_path).await;
      observer.remove_media_item(device.uri.clone(), uri, record.media_type).await;
    }
    // Buffered unflags/removals below the flush threshold would otherwise
    // sit unflushed, leaving `processing_done`'s removal equality unable to
    // settle and the device stuck in `Parsing`.
    observer.finalize_scan(device.uri.clone()).await;

    let persisted = cache.lock().unwrap().persist(&CACHE_MANAGER.cache_path(&device.uuid));
    persisted.map_err(|e| CoreError::Cache(e.to_string()))?;
    tracing::info!("warm file-tree-walk on '{}' completed", device.uri);
    Ok(())
  }

  fn item_uri(&self, device: &Device, path: &std::path::Path) -> String {
    let mountpoint = device.mountpoint();
    let suffix = path.strip_prefix(&mountpoint).unwrap_or(path);
    format!("{}/{}", device.uri.trim_end_matches('/'), suffix.to_string_lossy())
  }

  /// Enough to decide cache hit/miss without allocating a `MediaItem`.
  async fn peek_item(&self, path: &std::path::Path) -> Option<(mindexer_core::MediaType, u64)> {
    let ext = extension_of(path)?;
    let (media_type, _) = self.configurator.type_info(&ext)?;
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some((media_type, fingerprint_of(&metadata)))
  }

  async fn build_item(&self, device: &Device, path: &std::path::Path) -> Option<MediaItem> {
    let ext = extension_of(path)?;
    let Some((media_type, extractor_kind)) = self.configurator.type_info(&ext) else {
      tracing::debug!("'{ext}' is not a supported extension");
      return None;
    };

    let metadata = match tokio::fs::metadata(path).await {
      Ok(m) => m,
      Err(e) => {
        tracing::warn!("could not stat '{}': {e}", path.display());
        return None;
      }
    };

    let uri = self.item_uri(device, path);
    Some(MediaItem::new(uri, device.uri.clone(), ext, media_type, extractor_kind, fingerprint_of(&metadata), metadata.len()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use mindexer_cache::{Cache, CacheRecord};
  use mindexer_core::{DeviceState, MediaType};
  use std::sync::Mutex as StdMutex;

  /// Mirrors `MINDEXER_BASE_DIR`'s role as the hermetic-tree override for
  /// `mindexer_config::PATHS` (see `mindexer-config`'s own `paths.rs` tests) —
  /// this is the only test in this crate that touches it, so it is safe to
  /// set once, before `PATHS`/`CACHE_MANAGER` are ever resolved.
  struct EnvVarGuard {
    key: &'static str,
  }

  impl EnvVarGuard {
    fn set(key: &'static str, value: &std::path::Path) -> Self {
      unsafe { std::env::set_var(key, value) };
      Self { key }
    }
  }

  impl Drop for EnvVarGuard {
    fn drop(&mut self) {
      unsafe { std::env::remove_var(self.key) };
    }
  }

  struct NoopDeviceObserver;
  impl DeviceObserver for NoopDeviceObserver {
    fn notify_device_list(&self) {}
    fn notify_device_scanned(&self, _device: Arc<Device>) {}
  }

  /// Stands in for the orchestrator: just enough counter/removal bookkeeping
  /// to prove out `warm_walk`'s wiring, without a real document database.
  struct RecordingObserver {
    device: Arc<Device>,
    removed: StdMutex<Vec<String>>,
  }

  #[async_trait]
  impl MediaItemObserver for RecordingObserver {
    async fn new_media_item(&self, item: MediaItem) {
      self.device.increment_processed(item.media_type);
    }

    async fn confirm_unchanged_item(&self, _device_uri: String, _uri: String, media_type: MediaType) {
      self.device.increment_processed(media_type);
    }

    async fn remove_media_item(&self, _device_uri: String, uri: String, _media_type: MediaType) {
      self.device.increment_remove_requested(1);
      self.device.increment_removed_total(1);
      self.removed.lock().unwrap().push(uri);
    }

    async fn finalize_scan(&self, _device_uri: String) {}
  }

  fn configurator_recognizing_mp3(config_dir: &std::path::Path) -> Arc<Configurator> {
    let path = config_dir.join("extensions.json");
    std::fs::write(
      &path,
      r#"{"force-sw-decoders": false, "supportedMediaExtension": {"audio": ["mp3"], "video": [], "image": []}}"#,
    )
    .unwrap();
    Arc::new(Configurator::load(&path).unwrap())
  }

  /// Scenario: a device's prior cache knew about `a.mp3` and `b.mp3`. A
  /// rescan finds `a.mp3` unchanged and a new `c.mp3`; `b.mp3` is gone. `a`
  /// must survive (unflagged, not deleted), `b` must be the only removal,
  /// and the device must settle back to `Idle`.
  #[tokio::test]
  async fn warm_rescan_keeps_unchanged_items_and_only_removes_what_vanished() {
    let base = tempfile::tempdir().unwrap();
    let _env = EnvVarGuard::set("MINDEXER_BASE_DIR", base.path());

    let mountpoint = tempfile::tempdir().unwrap();
    std::fs::write(mountpoint.path().join("a.mp3"), b"unchanged").unwrap();
    std::fs::write(mountpoint.path().join("c.mp3"), b"new").unwrap();

    let configurator = configurator_recognizing_mp3(base.path());
    let core = PluginCore::new("fake-test", configurator, Arc::new(NoopDeviceObserver));
    let device = core.add_device("fake-test:///dev", mountpoint.path().to_str().unwrap(), "uuid-test");
    device.begin_scan();
    device.begin_parsing(); // pretend a first scan already happened: this is now a rescan

    let a_uri = format!("{}/a.mp3", device.uri);
    let b_uri = format!("{}/b.mp3", device.uri);
    let a_fingerprint = fingerprint_of(&std::fs::metadata(mountpoint.path().join("a.mp3")).unwrap());

    let mut prior = Cache::new();
    prior.insert(a_uri.clone(), CacheRecord { fingerprint: a_fingerprint, media_type: MediaType::Audio, thumbnail_name: String::new() });
    prior.insert(b_uri.clone(), CacheRecord { fingerprint: 1, media_type: MediaType::Audio, thumbnail_name: String::new() });
    prior.persist(&mindexer_cache::CACHE_MANAGER.cache_path(&device.uuid)).unwrap();

    let observer = Arc::new(RecordingObserver { device: device.clone(), removed: StdMutex::new(Vec::new()) });
    core.scan(&device.uri, observer.clone()).await.unwrap();

    assert!(device.processing_done(), "every discovered item and every removal should have been accounted for");
    assert_eq!(device.state(), DeviceState::Idle);
    assert_eq!(*observer.removed.lock().unwrap(), vec![b_uri.clone()]);

    let persisted = Cache::load(&mindexer_cache::CACHE_MANAGER.cache_path(&device.uuid)).unwrap();
    assert!(persisted.residue().any(|(uri, _)| uri == a_uri.as_str()), "a.mp3 should have survived the rescan");
    assert!(!persisted.residue().any(|(uri, _)| uri == b_uri.as_str()), "b.mp3 should not be in the next cache");
  }
}

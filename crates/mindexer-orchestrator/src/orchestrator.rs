use async_trait::async_trait;
use mindexer_config::PATHS;
use mindexer_core::ports::{DeviceObserver, MediaItemObserver, Plugin};
use mindexer_core::{CoreError, Device, DeviceMeta, MediaItem, MediaType};
use mindexer_db::{DbSyncLayer, LocalStore};
use mindexer_extract::ExtractorPool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::sync::Notify;

/// Ties the plugin registry, the extractor pool, and the DB sync layer
/// together. Implements both observer ports the rest of the system calls
/// into: `DeviceObserver` reacts to availability changes by kicking off a
/// scan or flagging a device's rows dirty, `MediaItemObserver` reacts to a
/// walk's discoveries by extracting and writing each item.
pub struct Orchestrator {
  /// `DeviceObserver` only hands us `&self`, but starting a scan needs an
  /// `Arc<dyn MediaItemObserver>` to hand the plugin — a weak self-reference
  /// set up via `Arc::new_cyclic` lets us upgrade back to one.
  self_ref: Weak<Orchestrator>,
  plugins: RwLock<Vec<Arc<dyn Plugin>>>,
  extractor: Arc<ExtractorPool>,
  sync: Arc<DbSyncLayer>,
  local_store: Arc<LocalStore>,
  /// Device uris with a cleanup pass outstanding. A uri already present
  /// when a second request arrives is a no-op coalesce — the worker will
  /// still observe it on its next drain.
  cleanup_pending: Mutex<HashSet<String>>,
  cleanup_notify: Notify,
}

impl Orchestrator {
  pub fn new(extractor: Arc<ExtractorPool>, sync: Arc<DbSyncLayer>, local_store: Arc<LocalStore>) -> Arc<Self> {
    Arc::new_cyclic(|self_ref| Self {
      self_ref: self_ref.clone(),
      plugins: RwLock::new(Vec::new()),
      extractor,
      sync,
      local_store,
      cleanup_pending: Mutex::new(HashSet::new()),
      cleanup_notify: Notify::new(),
    })
  }

  /// Registers a plugin and replays its previously known devices from the
  /// local store, so persisted display metadata survives a restart even
  /// while a device is still unplugged (§4.8). Injected devices carry no
  /// mountpoint; the plugin fills one in if and when it rediscovers them.
  pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) {
    let prefix = plugin.scheme();
    match self.local_store.known_devices_for_prefix(prefix) {
      Ok(rows) => {
        for row in rows {
          let device = Arc::new(Device::with_alive(row.uri, "", row.uuid, -1, false));
          device.set_meta(DeviceMeta { name: row.name, description: row.description, icon: row.icon });
          plugin.inject_device(device);
        }
      }
      Err(e) => tracing::warn!("could not load known devices for '{prefix}': {e}"),
    }
    self.plugins.write().unwrap().push(plugin);
  }

  /// Spawns the single-slot cleanup worker. Runs for the life of the
  /// orchestrator, parked on `cleanup_notify` between batches.
  pub fn spawn_cleanup_worker(self: &Arc<Self>) {
    let this = self.clone();
    tokio::spawn(async move { this.run_cleanup_worker().await });
  }

  async fn run_cleanup_worker(self: Arc<Self>) {
    loop {
      self.cleanup_notify.notified().await;
      let uris: Vec<String> = { self.cleanup_pending.lock().unwrap().drain().collect() };
      for uri in uris {
        let Some(device) = self.find_device(&uri) else { continue };
        if let Err(e) = self.cleanup(&device).await {
          tracing::error!("cleanup of '{uri}' failed: {e}");
        }
      }
    }
  }

  fn request_cleanup(&self, device_uri: &str) {
    self.cleanup_pending.lock().unwrap().insert(device_uri.to_string());
    self.cleanup_notify.notify_one();
  }

  fn find_device(&self, uri: &str) -> Option<Arc<Device>> {
    self.plugins.read().unwrap().iter().find_map(|p| p.device(uri))
  }

  fn full_path(&self, device: &Device, item: &MediaItem) -> std::path::PathBuf {
    let suffix = item.uri.strip_prefix(device.uri.trim_end_matches('/')).unwrap_or(&item.uri);
    std::path::Path::new(&device.mountpoint()).join(suffix.trim_start_matches('/'))
  }

  /// Extracts (always — the cache already filtered out anything unchanged
  /// before this was ever called, see `mindexer-plugins::PluginCore::warm_walk`,
  /// so there is no DB round-trip to make first) and writes the result.
  async fn extract_and_write(&self, device: &Arc<Device>, mut item: MediaItem) {
    let path = self.full_path(device, &item);
    let thumbnail_dir = PATHS.thumbnail_dir(&device.uuid);

    if let Err(e) = self.extractor.extract(&path, &thumbnail_dir, &mut item, true).await {
      tracing::warn!("extraction failed for '{}': {e}", item.uri);
    }
    item.parsed = true;

    let media_type = item.media_type;
    if let Err(e) = self.sync.put_meta(device, &item).await {
      tracing::error!("failed to write '{}' to the document database: {e}", item.uri);
      return;
    }
    device.increment_processed(media_type);
    self.check_completion(device);
  }

  fn check_completion(&self, device: &Arc<Device>) {
    if device.processing_done() {
      self.notify_device_scanned(device.clone());
      self.request_cleanup(&device.uri);
    }
  }

  /// Deletes every row still marked dirty under `device`'s uri — the rows a
  /// rescan's walk never re-confirmed — along with their thumbnail files.
  async fn cleanup(&self, device: &Device) -> Result<(), CoreError> {
    let dirty = self.sync.find_dirty(device).await?;
    for (media_type, row) in dirty {
      let Some(uri) = row.get("uri").and_then(|v| v.as_str()).map(str::to_owned) else { continue };
      if let Some(thumb) = row.get("thumbnail").and_then(|v| v.as_str()) {
        if !thumb.is_empty() {
          let path = PATHS.thumbnail_path(&device.uuid, thumb);
          let _ = tokio::fs::remove_file(&path).await;
        }
      }
      self.sync.queue_remove(device, uri, media_type).await?;
      device.increment_removed(media_type);
    }
    self.sync.flush_delete_items(device).await?;
    Ok(())
  }
}

impl DeviceObserver for Orchestrator {
  /// The set of known devices changed. A device that is now available and
  /// sitting `Idle` is either newly (re)connected or just finished its
  /// previous scan with nothing left outstanding — either way it is due a
  /// rescan, which is first preceded by flagging every one of its rows
  /// dirty (§4.7's pre-pass: the walk unflags whatever it re-confirms, and
  /// whatever is left dirty afterwards is exactly what `cleanup` deletes).
  /// A device going unavailable needs no DB call of its own here —
  /// `Device::set_available` already reset its counters and state.
  fn notify_device_list(&self) {
    let Some(this) = self.self_ref.upgrade() else { return };
    for plugin in self.plugins.read().unwrap().iter() {
      for device in plugin.devices() {
        if !device.available() || device.state() != mindexer_core::DeviceState::Idle {
          continue;
        }
        let plugin = plugin.clone();
        let sync = self.sync.clone();
        let observer: Arc<dyn MediaItemObserver> = this.clone();
        let orchestrator = this.clone();
        let uri = device.uri.clone();
        tokio::spawn(async move {
          if let Err(e) = sync.mark_dirty(&device).await {
            tracing::error!("failed to mark '{}' dirty: {e}", device.uri);
            return;
          }
          if let Err(e) = plugin.scan(&uri, observer).await {
            tracing::error!("scan of '{uri}' failed: {e}");
          }
          // Every item discovered during the walk is extracted and written
          // synchronously before the walk moves on to the next one, so by
          // the time `scan` returns nothing is outstanding — but the last
          // item's own completion check ran while the device was still
          // `Scanning`, before `processing_done` would admit it. Check
          // again now that the device has settled into `Parsing`.
          orchestrator.check_completion(&device);
        });
      }
    }
  }

  fn notify_device_scanned(&self, device: Arc<Device>) {
    tracing::info!("device '{}' finished scanning", device.uri);
  }
}

#[async_trait]
impl MediaItemObserver for Orchestrator {
  async fn new_media_item(&self, item: MediaItem) {
    let Some(device) = self.find_device(&item.device_uri) else {
      tracing::warn!("item '{}' references an unknown device", item.uri);
      return;
    };
    self.extract_and_write(&device, item).await;
  }

  async fn confirm_unchanged_item(&self, device_uri: String, uri: String, media_type: MediaType) {
    let Some(device) = self.find_device(&device_uri) else {
      tracing::warn!("confirmed-unchanged item '{uri}' references an unknown device");
      return;
    };
    if let Err(e) = self.sync.confirm_unchanged(&device, uri.clone(), media_type).await {
      tracing::error!("failed to clear the dirty flag on '{uri}': {e}");
      return;
    }
    device.increment_processed(media_type);
    self.check_completion(&device);
  }

  async fn remove_media_item(&self, device_uri: String, uri: String, media_type: MediaType) {
    let Some(device) = self.find_device(&device_uri) else {
      tracing::warn!("removed item '{uri}' references an unknown device");
      return;
    };
    if let Err(e) = self.sync.queue_remove(&device, uri.clone(), media_type).await {
      tracing::error!("failed to queue removal of '{uri}': {e}");
      return;
    }
    self.check_completion(&device);
  }

  async fn finalize_scan(&self, device_uri: String) {
    let Some(device) = self.find_device(&device_uri) else { return };
    if let Err(e) = self.sync.flush_unflag_dirty(&device).await {
      tracing::error!("failed to flush pending dirty-unflags for '{device_uri}': {e}");
      return;
    }
    if let Err(e) = self.sync.flush_delete_items(&device).await {
      tracing::error!("failed to flush pending removals for '{device_uri}': {e}");
      return;
    }
    self.check_completion(&device);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use mindexer_core::{Attribute, DeviceState, ExtractorKind, MediaType};
  use mindexer_db::InMemoryDocumentDb;
  use std::collections::HashMap;
  use std::time::Duration;

  /// In-process stand-in for a real plugin: feeds a fixed set of items on
  /// `scan` instead of walking a real filesystem, so tests exercise the
  /// orchestrator without touching disk. `inject_device` behaves like
  /// `PluginCore`'s, so device-replay tests can observe it.
  struct FakePlugin {
    devices: Mutex<HashMap<String, Arc<Device>>>,
    items: Mutex<Vec<MediaItem>>,
  }

  impl FakePlugin {
    fn with_device(device: Arc<Device>, items: Vec<MediaItem>) -> Self {
      let mut devices = HashMap::new();
      devices.insert(device.uri.clone(), device);
      Self { devices: Mutex::new(devices), items: Mutex::new(items) }
    }
  }

  #[async_trait]
  impl Plugin for FakePlugin {
    fn scheme(&self) -> &'static str {
      "fake"
    }

    fn devices(&self) -> Vec<Arc<Device>> {
      self.devices.lock().unwrap().values().cloned().collect()
    }

    fn device(&self, uri: &str) -> Option<Arc<Device>> {
      self.devices.lock().unwrap().get(uri).cloned()
    }

    fn inject_device(&self, device: Arc<Device>) {
      self.devices.lock().unwrap().entry(device.uri.clone()).or_insert(device);
    }

    fn remove_device(&self, _uri: &str) -> Option<Arc<Device>> {
      None
    }

    async fn set_device_notifications(&self, _enabled: bool) {}

    async fn check_devices(&self) {}

    async fn scan(&self, uri: &str, observer: Arc<dyn MediaItemObserver>) -> Result<(), CoreError> {
      let device = self.device(uri).ok_or(CoreError::NotFound)?;
      device.begin_scan();
      let items: Vec<_> = self.items.lock().unwrap().drain(..).collect();
      for item in items {
        device.increment_discovered(item.media_type);
        observer.new_media_item(item).await;
      }
      device.begin_parsing();
      Ok(())
    }

    fn playback_uri(&self, uri: &str) -> String {
      uri.to_string()
    }
  }

  fn orchestrator_under_test() -> (Arc<Orchestrator>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let db = Arc::new(InMemoryDocumentDb::new());
    let sync = Arc::new(DbSyncLayer::new(db, 100));
    let local_store = Arc::new(LocalStore::new(&tmp.path().join("store.sqlite"), "WAL").unwrap());
    let extractor = Arc::new(ExtractorPool::new(2, false));
    (Orchestrator::new(extractor, sync, local_store), tmp)
  }

  fn sample_item(device_uri: &str, name: &str) -> MediaItem {
    let mut item = MediaItem::new(
      format!("{device_uri}/{name}"),
      device_uri,
      "mp3",
      MediaType::Audio,
      ExtractorKind::TagExtractor,
      1,
      10,
    );
    item.set(Attribute::Title, "placeholder");
    item
  }

  #[tokio::test]
  async fn scan_writes_every_item_and_settles_the_device_back_to_idle() {
    let (orchestrator, _tmp) = orchestrator_under_test();
    let device = Arc::new(Device::new("fake:///dev-1", "/mnt/dev-1", "uuid-1"));
    let plugin = Arc::new(FakePlugin::with_device(
      device.clone(),
      vec![sample_item("fake:///dev-1", "a.mp3"), sample_item("fake:///dev-1", "b.mp3")],
    ));
    orchestrator.register_plugin(plugin);

    orchestrator.notify_device_list();

    for _ in 0..50 {
      if device.state() == DeviceState::Idle && device.with_counters(|c| c.processed(MediaType::Audio)) == 2 {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(device.with_counters(|c| c.discovered(MediaType::Audio)), 2);
    assert_eq!(device.with_counters(|c| c.processed(MediaType::Audio)), 2);
    assert_eq!(device.state(), DeviceState::Idle);
  }

  #[tokio::test]
  async fn register_plugin_replays_known_devices_as_unavailable() {
    let (orchestrator, _tmp) = orchestrator_under_test();
    orchestrator
      .local_store
      .upsert_known_device(mindexer_db::NewKnownDeviceRow {
        uri: "fake:///dev-2".into(),
        plugin_prefix: "fake".into(),
        uuid: "uuid-2".into(),
        name: "Old Device".into(),
        description: "".into(),
        icon: "".into(),
        enabled: true,
      })
      .unwrap();

    let device = Arc::new(Device::new("fake:///dev-1", "/mnt/dev-1", "uuid-1"));
    let plugin = Arc::new(FakePlugin::with_device(device, Vec::new()));
    orchestrator.register_plugin(plugin.clone());

    let injected = plugin.device("fake:///dev-2").expect("replayed device should have been injected");
    assert!(!injected.available());
    assert_eq!(injected.meta().name, "Old Device");
  }
}

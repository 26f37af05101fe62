use super::media_type::MediaType;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
  Idle,
  Scanning,
  Parsing,
  Inactive,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceMeta {
  pub name: String,
  pub description: String,
  pub icon: String,
}

/// Per-type and aggregate bookkeeping used to decide when a device's scan
/// has been fully accounted for by the database.
#[derive(Debug, Clone, Default)]
pub struct Counters {
  discovered: [u64; 3],
  processed: [u64; 3],
  removed: [u64; 3],
  pub total_put: u64,
  pub total_dirty_cleared: u64,
  pub total_remove_requested: u64,
  total_item_count: u64,
  total_processed_count: u64,
  remove_count: u64,
  total_removed_count: u64,
}

fn idx(t: MediaType) -> usize {
  match t {
    MediaType::Audio => 0,
    MediaType::Video => 1,
    MediaType::Image => 2,
  }
}

impl Counters {
  pub fn discovered(&self, t: MediaType) -> u64 {
    self.discovered[idx(t)]
  }

  pub fn processed(&self, t: MediaType) -> u64 {
    self.processed[idx(t)]
  }

  pub fn removed(&self, t: MediaType) -> u64 {
    self.removed[idx(t)]
  }

  fn reset(&mut self) {
    *self = Counters::default();
  }
}

struct Inner {
  mountpoint: String,
  meta: DeviceMeta,
  state: DeviceState,
  new_mounted: bool,
  counters: Counters,
}

/// A single discovered storage source. Owned by the plugin that discovered
/// it; shared references are held transiently by the orchestrator and by
/// in-flight extractor tasks.
///
/// `available`/`alive_refcount` are plain atomics rather than behind the
/// `inner` lock because poll-mode liveness checks (external hot-plug
/// observers decrementing a refcount on each tick) must never block on a
/// scan holding the device lock.
pub struct Device {
  pub uri: String,
  pub uuid: String,
  available: AtomicBool,
  /// Negative: poll-mode disabled. Zero: expired (device considered gone on
  /// next check). Positive: remaining liveness ticks.
  alive_refcount: AtomicI32,
  inner: RwLock<Inner>,
}

impl Device {
  pub fn new(uri: impl Into<String>, mountpoint: impl Into<String>, uuid: impl Into<String>) -> Self {
    Self::with_alive(uri, mountpoint, uuid, -1, true)
  }

  pub fn with_alive(
    uri: impl Into<String>,
    mountpoint: impl Into<String>,
    uuid: impl Into<String>,
    alive: i32,
    available: bool,
  ) -> Self {
    Self {
      uri: uri.into(),
      uuid: uuid.into(),
      available: AtomicBool::new(available),
      alive_refcount: AtomicI32::new(alive),
      inner: RwLock::new(Inner {
        mountpoint: mountpoint.into(),
        meta: DeviceMeta::default(),
        state: DeviceState::Idle,
        new_mounted: true,
        counters: Counters::default(),
      }),
    }
  }

  pub fn mountpoint(&self) -> String {
    self.inner.read().unwrap().mountpoint.clone()
  }

  /// Updates the mountpoint a reconnected device was remounted under — the
  /// uri and uuid a hot-plug backend reports stay stable across a
  /// disconnect/reconnect cycle, but the mountpoint is not guaranteed to.
  pub fn set_mountpoint(&self, mountpoint: impl Into<String>) {
    self.inner.write().unwrap().mountpoint = mountpoint.into();
  }

  pub fn available(&self) -> bool {
    self.available.load(Ordering::Acquire)
  }

  pub fn new_mounted(&self) -> bool {
    self.inner.read().unwrap().new_mounted
  }

  pub fn state(&self) -> DeviceState {
    self.inner.read().unwrap().state
  }

  pub fn meta(&self) -> DeviceMeta {
    self.inner.read().unwrap().meta.clone()
  }

  pub fn set_meta(&self, meta: DeviceMeta) {
    self.inner.write().unwrap().meta = meta;
  }

  fn set_state(&self, state: DeviceState) {
    self.inner.write().unwrap().state = state;
  }

  /// Poll-mode liveness tick. Returns `false` once the refcount has been
  /// exhausted, signalling the caller should mark the device unavailable.
  /// A negative refcount means poll-mode is off and this always returns
  /// `true`.
  pub fn check_alive(&self) -> bool {
    let current = self.alive_refcount.load(Ordering::Acquire);
    if current < 0 {
      return true;
    }
    if current == 0 {
      return false;
    }
    self.alive_refcount.fetch_sub(1, Ordering::AcqRel);
    true
  }

  /// Marks the device available/unavailable. Returns whether this changed
  /// anything. Going unavailable clears the icon, resets every counter, and
  /// forces the state to `Inactive`. Going available again returns it to
  /// `Idle`, ready to be scanned.
  pub fn set_available(&self, available: bool) -> bool {
    let changed = self.available.swap(available, Ordering::AcqRel) != available;
    if changed {
      let mut inner = self.inner.write().unwrap();
      if available {
        inner.state = DeviceState::Idle;
      } else {
        inner.meta.icon.clear();
        inner.counters.reset();
        inner.state = DeviceState::Inactive;
      }
    }
    changed
  }

  pub fn reset_counts(&self) {
    let mut inner = self.inner.write().unwrap();
    inner.counters.reset();
  }

  pub fn with_counters<R>(&self, f: impl FnOnce(&Counters) -> R) -> R {
    f(&self.inner.read().unwrap().counters)
  }

  pub fn increment_discovered(&self, t: MediaType) {
    let mut inner = self.inner.write().unwrap();
    inner.counters.discovered[idx(t)] += 1;
    inner.counters.total_item_count += 1;
  }

  pub fn increment_processed(&self, t: MediaType) {
    let mut inner = self.inner.write().unwrap();
    inner.counters.processed[idx(t)] += 1;
    inner.counters.total_processed_count += 1;
  }

  /// Per-type removal stat only — does not advance the aggregate counter
  /// `processing_done` gates on. See `increment_removed_total`.
  pub fn increment_removed(&self, t: MediaType) {
    let mut inner = self.inner.write().unwrap();
    inner.counters.removed[idx(t)] += 1;
  }

  /// A removal was requested (buffered for deletion). Advances the
  /// request-side half of the removal equality `processing_done` checks.
  pub fn increment_remove_requested(&self, n: u64) {
    let mut inner = self.inner.write().unwrap();
    inner.counters.remove_count += n;
    inner.counters.total_remove_requested += n;
  }

  /// A buffered removal was actually flushed to the database. Advances the
  /// ack-side half of the removal equality `processing_done` checks.
  pub fn increment_removed_total(&self, n: u64) {
    self.inner.write().unwrap().counters.total_removed_count += n;
  }

  pub fn increment_put(&self, n: u64) {
    self.inner.write().unwrap().counters.total_put += n;
  }

  pub fn increment_dirty_cleared(&self, n: u64) {
    self.inner.write().unwrap().counters.total_dirty_cleared += n;
  }

  /// Begins a scan: flips state to `Scanning` and clears `new_mounted` once
  /// the first scan has actually started.
  pub fn begin_scan(&self) {
    self.set_state(DeviceState::Scanning);
  }

  /// The walk has finished emitting entries; extraction/DB round-trips may
  /// still be outstanding.
  pub fn begin_parsing(&self) {
    let mut inner = self.inner.write().unwrap();
    inner.state = DeviceState::Parsing;
    inner.new_mounted = false;
  }

  /// True once every discovered item has been accounted for by the database
  /// and every pending removal has been acknowledged. On success the device
  /// returns to `Idle`.
  pub fn processing_done(&self) -> bool {
    let mut inner = self.inner.write().unwrap();
    if inner.state != DeviceState::Parsing {
      return false;
    }
    let c = &inner.counters;
    let done = c.total_item_count == c.total_processed_count && c.remove_count == c.total_removed_count;
    if done {
      inner.state = DeviceState::Idle;
    }
    done
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn processing_done_requires_both_equalities() {
    let dev = Device::new("storage:///mnt/x", "/mnt/x", "uuid-1");
    dev.begin_scan();
    dev.begin_parsing();

    dev.increment_discovered(MediaType::Audio);
    assert!(!dev.processing_done());

    dev.increment_processed(MediaType::Audio);
    assert!(dev.processing_done());
    assert_eq!(dev.state(), DeviceState::Idle);
  }

  #[test]
  fn processing_done_waits_for_removals_to_be_acknowledged() {
    let dev = Device::new("storage:///mnt/x", "/mnt/x", "uuid-1");
    dev.begin_scan();
    dev.begin_parsing();

    dev.increment_discovered(MediaType::Audio);
    dev.increment_processed(MediaType::Audio);
    dev.increment_remove_requested(1);
    assert!(!dev.processing_done(), "a removal was requested but not yet acknowledged");

    dev.increment_removed_total(1);
    assert!(dev.processing_done());
    assert_eq!(dev.state(), DeviceState::Idle);
  }

  #[test]
  fn going_unavailable_resets_counters_and_state() {
    let dev = Device::new("storage:///mnt/x", "/mnt/x", "uuid-1");
    dev.begin_scan();
    dev.increment_discovered(MediaType::Image);

    assert!(dev.set_available(false));
    assert_eq!(dev.state(), DeviceState::Inactive);
    assert_eq!(dev.with_counters(|c| c.discovered(MediaType::Image)), 0);
  }

  #[test]
  fn check_alive_counts_down_then_expires() {
    let dev = Device::with_alive("msc:///uuid-2", "/mnt/y", "uuid-2", 2, true);
    assert!(dev.check_alive());
    assert!(dev.check_alive());
    assert!(!dev.check_alive());
  }

  #[test]
  fn negative_refcount_never_expires() {
    let dev = Device::new("storage:///mnt/z", "/mnt/z", "uuid-3");
    for _ in 0..5 {
      assert!(dev.check_alive());
    }
  }
}

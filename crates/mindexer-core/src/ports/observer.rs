use crate::domain::{Device, MediaItem, MediaType};
use std::sync::Arc;

/// Notified of device lifecycle events. Implemented by the indexing
/// orchestrator; called by plugins and by the device's own scan task.
pub trait DeviceObserver: Send + Sync {
  /// The set of known devices changed (added/removed/availability flip).
  fn notify_device_list(&self);

  /// `device` just transitioned from `Parsing` back to `Idle`.
  fn notify_device_scanned(&self, device: Arc<Device>);
}

/// Notified as a plugin's file-tree-walk discovers, re-confirms, or retires
/// items. Implemented by the indexing orchestrator.
#[async_trait::async_trait]
pub trait MediaItemObserver: Send + Sync {
  async fn new_media_item(&self, item: MediaItem);

  /// A rescan's walk hashed `uri` again and got the same fingerprint — the
  /// row already in the database is still current and just needs its dirty
  /// flag cleared, not a full re-extract.
  async fn confirm_unchanged_item(&self, device_uri: String, uri: String, media_type: MediaType);

  /// `uri` no longer exists under `device_uri`'s mountpoint.
  async fn remove_media_item(&self, device_uri: String, uri: String, media_type: MediaType);

  /// The walk itself is done; any still-buffered unflag/removal batches for
  /// `device_uri` should be flushed and completion re-checked, since a batch
  /// below the flush threshold otherwise sits unflushed indefinitely.
  async fn finalize_scan(&self, device_uri: String);
}

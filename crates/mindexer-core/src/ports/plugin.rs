use crate::domain::Device;
use crate::errors::CoreError;
use crate::ports::observer::MediaItemObserver;
use std::sync::Arc;

/// A source of devices, and the entity that knows how to walk one of its
/// devices' file trees and hand items to a `MediaItemObserver`.
///
/// Closed variant set in practice — `UsbStoragePlugin`, `LocalStoragePlugin`,
/// `MtpPlugin`, `UpnpPlugin` — modeled as a trait with concrete
/// implementations rather than a base class, since Rust has no inheritance.
#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
  /// URI scheme this plugin owns, e.g. `"msc"`, `"storage"`, `"mtp"`, `"upnp"`.
  fn scheme(&self) -> &'static str;

  fn matches_uri(&self, uri: &str) -> bool {
    uri.starts_with(self.scheme()) && uri[self.scheme().len()..].starts_with("://")
  }

  fn devices(&self) -> Vec<Arc<Device>>;

  fn device(&self, uri: &str) -> Option<Arc<Device>>;

  /// Registers a device the plugin did not itself discover this run — used
  /// at startup to re-inject devices persisted by `mindexer-db`'s local
  /// store, so stale metadata (name/description/icon) survives a restart
  /// even though the device starts out unavailable.
  fn inject_device(&self, device: Arc<Device>);

  fn remove_device(&self, uri: &str) -> Option<Arc<Device>>;

  /// Starts or stops device detection. Reference-counted by the caller:
  /// only the transition from zero to one observer (or one to zero) should
  /// actually start/stop the underlying detection mechanism.
  async fn set_device_notifications(&self, enabled: bool);

  /// Poll-mode liveness sweep over every known device.
  async fn check_devices(&self);

  /// Walks `uri`'s file tree (cold or warm, depending on cache presence)
  /// and reports every discovered/retired item to `observer`.
  async fn scan(&self, uri: &str, observer: Arc<dyn MediaItemObserver>) -> Result<(), CoreError>;

  /// Strips the device-uri prefix from `uri` and rewrites it into a
  /// directly playable `file://` URI.
  fn playback_uri(&self, uri: &str) -> String;

  fn active(&self) -> bool {
    !self.devices().is_empty()
  }
}

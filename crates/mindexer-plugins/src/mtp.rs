use crate::common::PluginCore;
use crate::hotplug::{HotplugNotifier, HotplugSink};
use async_trait::async_trait;
use mindexer_config::Configurator;
use mindexer_core::ports::{DeviceObserver, MediaItemObserver, Plugin};
use mindexer_core::{CoreError, Device};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Replaces `:` and whitespace with `-` so a device serial is safe to embed
/// in a uri path segment.
pub fn mangle_serial(serial: &str) -> String {
  serial.chars().map(|c| if c == ':' || c.is_whitespace() { '-' } else { c }).collect()
}

struct MtpSink(Arc<PluginCore>);

impl HotplugSink for MtpSink {
  fn on_device_added(&self, uri: &str, mountpoint: &str, uuid: &str) {
    self.0.add_device(uri, mountpoint, uuid);
  }

  fn on_device_removed(&self, uri: &str) {
    self.0.remove_device(uri);
  }
}

/// MTP (Media Transfer Protocol) devices, `mtp://<mangled-serial>`. Same
/// hot-plug contract as `UsbStoragePlugin`.
pub struct MtpPlugin {
  core: Arc<PluginCore>,
  notifier: Arc<dyn HotplugNotifier>,
  detecting: AtomicBool,
}

impl MtpPlugin {
  pub fn new(configurator: Arc<Configurator>, observer: Arc<dyn DeviceObserver>, notifier: Arc<dyn HotplugNotifier>) -> Self {
    Self { core: Arc::new(PluginCore::new("mtp", configurator, observer)), notifier, detecting: AtomicBool::new(false) }
  }
}

#[async_trait]
impl Plugin for MtpPlugin {
  fn scheme(&self) -> &'static str {
    self.core.scheme()
  }

  fn devices(&self) -> Vec<Arc<Device>> {
    self.core.devices()
  }

  fn device(&self, uri: &str) -> Option<Arc<Device>> {
    self.core.get(uri)
  }

  fn inject_device(&self, device: Arc<Device>) {
    self.core.inject_device(device);
  }

  fn remove_device(&self, uri: &str) -> Option<Arc<Device>> {
    self.core.remove_device(uri)
  }

  async fn set_device_notifications(&self, enabled: bool) {
    if enabled && !self.detecting.swap(true, Ordering::AcqRel) {
      tracing::info!("enabling MTP device detection");
      self.notifier.start(Arc::new(MtpSink(self.core.clone()))).await;
    } else if !enabled && self.detecting.swap(false, Ordering::AcqRel) {
      tracing::info!("disabling MTP device detection");
      self.notifier.stop().await;
    }
  }

  async fn check_devices(&self) {
    self.core.check_devices();
  }

  async fn scan(&self, uri: &str, observer: Arc<dyn MediaItemObserver>) -> Result<(), CoreError> {
    self.core.scan(uri, observer).await
  }

  fn playback_uri(&self, uri: &str) -> String {
    format!("file://{}", uri.trim_start_matches("mtp://"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mangles_colons_and_whitespace() {
    assert_eq!(mangle_serial("AB:12 34"), "AB-12-34");
  }
}

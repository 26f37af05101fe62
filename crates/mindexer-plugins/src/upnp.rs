use crate::common::PluginCore;
use crate::hotplug::{HotplugNotifier, HotplugSink, NullHotplugNotifier};
use crate::mtp::mangle_serial;
use async_trait::async_trait;
use mindexer_config::Configurator;
use mindexer_core::ports::{DeviceObserver, MediaItemObserver, Plugin};
use mindexer_core::{CoreError, Device};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct UpnpSink(Arc<PluginCore>);

impl HotplugSink for UpnpSink {
  fn on_device_added(&self, uri: &str, mountpoint: &str, uuid: &str) {
    self.0.add_device(uri, mountpoint, uuid);
  }

  fn on_device_removed(&self, uri: &str) {
    self.0.remove_device(uri);
  }
}

/// UPnP media servers, `upnp://<mangled-device-id>`. SSDP discovery is
/// network plumbing out of scope for this core — by default this plugin
/// only ever gains devices via `inject_device`, but it participates fully in
/// scan/extract/sync once one exists. A real `HotplugNotifier` (driving
/// discovery over the network) can still be supplied in its place.
pub struct UpnpPlugin {
  core: Arc<PluginCore>,
  notifier: Arc<dyn HotplugNotifier>,
  detecting: AtomicBool,
}

impl UpnpPlugin {
  pub fn new(configurator: Arc<Configurator>, observer: Arc<dyn DeviceObserver>) -> Self {
    Self::with_notifier(configurator, observer, Arc::new(NullHotplugNotifier))
  }

  pub fn with_notifier(configurator: Arc<Configurator>, observer: Arc<dyn DeviceObserver>, notifier: Arc<dyn HotplugNotifier>) -> Self {
    Self { core: Arc::new(PluginCore::new("upnp", configurator, observer)), notifier, detecting: AtomicBool::new(false) }
  }

  pub fn mangle_device_id(device_id: &str) -> String {
    mangle_serial(device_id)
  }
}

#[async_trait]
impl Plugin for UpnpPlugin {
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
      tracing::info!("enabling UPnP device detection");
      self.notifier.start(Arc::new(UpnpSink(self.core.clone()))).await;
    } else if !enabled && self.detecting.swap(false, Ordering::AcqRel) {
      tracing::info!("disabling UPnP device detection");
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
    format!("file://{}", uri.trim_start_matches("upnp://"))
  }
}

use std::sync::Arc;

/// Contract a real hot-plug backend (udev, MTP bus notifications, UPnP SSDP)
/// would implement. Out of scope here beyond the shape of the callback:
/// `UsbStoragePlugin`/`MtpPlugin`/`UpnpPlugin` each hold one and forward its
/// events into `add_device`/`remove_device`.
#[async_trait::async_trait]
pub trait HotplugNotifier: Send + Sync {
  /// Starts delivering events to `sink`. Called at most once per plugin
  /// instance, when the first device-notification observer registers.
  async fn start(&self, sink: Arc<dyn HotplugSink>);

  /// Stops delivering events. Called when the last observer unregisters.
  async fn stop(&self);
}

pub trait HotplugSink: Send + Sync {
  fn on_device_added(&self, uri: &str, mountpoint: &str, uuid: &str);
  fn on_device_removed(&self, uri: &str);
}

/// Default notifier for plugin kinds that have nothing to subscribe to in
/// this core (UPnP SSDP discovery, MTP bus enumeration) — devices only ever
/// appear via `inject_device`, e.g. from a persisted-device replay at
/// startup.
#[derive(Default)]
pub struct NullHotplugNotifier;

#[async_trait::async_trait]
impl HotplugNotifier for NullHotplugNotifier {
  async fn start(&self, _sink: Arc<dyn HotplugSink>) {}
  async fn stop(&self) {}
}

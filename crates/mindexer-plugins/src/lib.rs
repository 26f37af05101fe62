mod common;
mod hotplug;
mod local;
mod mtp;
mod upnp;
mod usb;

pub use hotplug::{HotplugNotifier, HotplugSink, NullHotplugNotifier};
pub use local::LocalStoragePlugin;
pub use mtp::{mangle_serial, MtpPlugin};
pub use upnp::UpnpPlugin;
pub use usb::UsbStoragePlugin;

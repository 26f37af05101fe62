use crate::common::PluginCore;
use async_trait::async_trait;
use mindexer_config::{Configurator, FsConfig};
use mindexer_core::ports::{DeviceObserver, MediaItemObserver, Plugin};
use mindexer_core::{CoreError, Device};
use std::sync::Arc;

/// Local filesystem roots, taken once from `STORAGE_DEVS` (colon-separated
/// absolute paths) or, when that variable is absent, `[fs].roots`. Never
/// unplugged — `set_device_notifications` just publishes the static list.
pub struct LocalStoragePlugin {
  core: PluginCore,
}

impl LocalStoragePlugin {
  pub fn new(configurator: Arc<Configurator>, observer: Arc<dyn DeviceObserver>, fs_config: &FsConfig) -> Self {
    let core = PluginCore::new("storage", configurator, observer);
    for root in discover_roots(fs_config) {
      let uri = format!("storage://{}", root);
      let uuid = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, uri.as_bytes()).to_string();
      core.add_device(&uri, &root, &uuid);
    }
    Self { core }
  }
}

fn discover_roots(fs_config: &FsConfig) -> Vec<String> {
  if let Ok(raw) = std::env::var("STORAGE_DEVS") {
    return raw.split(':').filter(|s| !s.is_empty()).map(str::to_owned).collect();
  }
  fs_config.roots.iter().map(|p| p.to_string_lossy().into_owned()).collect()
}

#[async_trait]
impl Plugin for LocalStoragePlugin {
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

  fn remove_device(&self, _uri: &str) -> Option<Arc<Device>> {
    // Local roots are configuration, not a removable medium.
    None
  }

  async fn set_device_notifications(&self, _enabled: bool) {
    // The device list is already fully populated at construction time.
  }

  async fn check_devices(&self) {
    // Local roots never go away on their own.
  }

  async fn scan(&self, uri: &str, observer: Arc<dyn MediaItemObserver>) -> Result<(), CoreError> {
    self.core.scan(uri, observer).await
  }

  fn playback_uri(&self, uri: &str) -> String {
    format!("file://{}", uri.trim_start_matches("storage://"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn storage_devs_takes_precedence_over_config_roots() {
    unsafe { std::env::set_var("STORAGE_DEVS", "/mnt/a:/mnt/b") };
    let fs_config = FsConfig { roots: vec!["/mnt/unused".into()], ..Default::default() };
    let roots = discover_roots(&fs_config);
    unsafe { std::env::remove_var("STORAGE_DEVS") };
    assert_eq!(roots, vec!["/mnt/a".to_string(), "/mnt/b".to_string()]);
  }

  #[test]
  fn falls_back_to_config_roots_when_env_is_absent() {
    unsafe { std::env::remove_var("STORAGE_DEVS") };
    let fs_config = FsConfig { roots: vec!["/mnt/music".into()], ..Default::default() };
    assert_eq!(discover_roots(&fs_config), vec!["/mnt/music".to_string()]);
  }
}

mod cli;
mod config;
mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mindexer_config::{Configurator, PATHS};
use mindexer_core::ports::{DeviceObserver, Plugin};
use mindexer_db::{DbSyncLayer, HttpDocumentDb, LocalStore};
use mindexer_extract::ExtractorPool;
use mindexer_orchestrator::Orchestrator;
use mindexer_plugins::{LocalStoragePlugin, MtpPlugin, NullHotplugNotifier, UpnpPlugin, UsbStoragePlugin};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::AppConfig;

fn init_tracing(log_level: Option<&str>) {
  let filter = log_level
    .map(EnvFilter::new)
    .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
  tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.log_level.as_deref());

  match run(cli).await {
    Ok(()) => std::process::ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!("startup failed: {e:#}");
      std::process::ExitCode::FAILURE
    }
  }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
  let app_config = AppConfig::load(cli.config.as_deref())?;

  let extensions_path = cli.extensions.unwrap_or_else(|| PATHS.extensions_file());
  let configurator = Arc::new(
    Configurator::load(&extensions_path)
      .map_err(|e| anyhow::anyhow!("loading extensions table '{}': {e}", extensions_path.display()))?,
  );

  let db = Arc::new(HttpDocumentDb::new(
    app_config.db.base_url.clone(),
    Duration::from_secs(app_config.db.request_timeout_secs),
  ));
  let sync = Arc::new(DbSyncLayer::new(db, app_config.db.flush_count));
  sync.ensure_kinds().await.map_err(|e| anyhow::anyhow!("document database unreachable at startup: {e}"))?;

  let db_filename = app_config.storage.db_filename.clone().unwrap_or_else(|| "mindexer.sqlite".to_string());
  let local_store_path = PATHS.data_dir.join(&db_filename);
  let local_store = Arc::new(
    LocalStore::new(&local_store_path, &app_config.storage.journal_mode)
      .map_err(|e| anyhow::anyhow!("opening local store '{}': {e}", local_store_path.display()))?,
  );

  let force_sw_decoders = app_config.extract.force_sw_decoders || configurator.force_sw_decoders();
  let extractor = Arc::new(ExtractorPool::new(app_config.extract.n_parallel_meta, force_sw_decoders));

  let orchestrator = Orchestrator::new(extractor, sync, local_store);
  let observer: Arc<dyn DeviceObserver> = orchestrator.clone();

  let usb = Arc::new(UsbStoragePlugin::new(configurator.clone(), observer.clone(), Arc::new(NullHotplugNotifier)));
  let mtp = Arc::new(MtpPlugin::new(configurator.clone(), observer.clone(), Arc::new(NullHotplugNotifier)));
  let upnp = Arc::new(UpnpPlugin::new(configurator.clone(), observer.clone()));
  let local = Arc::new(LocalStoragePlugin::new(configurator.clone(), observer.clone(), &app_config.fs));

  let plugins: Vec<Arc<dyn Plugin>> = vec![usb, mtp, upnp, local];
  for plugin in &plugins {
    orchestrator.register_plugin(plugin.clone());
  }

  orchestrator.spawn_cleanup_worker();

  for plugin in &plugins {
    plugin.set_device_notifications(true).await;
  }
  observer.notify_device_list();

  tracing::info!("mindexer daemon running with {} plugin(s)", plugins.len());

  let shutdown = CancellationToken::new();
  let sweep = tokio::spawn(periodic_check(plugins, shutdown.clone()));
  shutdown::wait_for_shutdown(shutdown).await;
  sweep.abort();

  tracing::info!("shutting down");
  Ok(())
}

/// Periodically re-checks every plugin's device liveness, so a device whose
/// hot-plug backend missed an event (or has none, like [`NullHotplugNotifier`])
/// is still reconciled eventually.
async fn periodic_check(plugins: Vec<Arc<dyn Plugin>>, shutdown: CancellationToken) {
  let mut tick = tokio::time::interval(Duration::from_secs(30));
  loop {
    tokio::select! {
      _ = tick.tick() => {
        for plugin in &plugins {
          plugin.check_devices().await;
        }
      }
      _ = shutdown.cancelled() => return,
    }
  }
}

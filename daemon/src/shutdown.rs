use tokio_util::sync::CancellationToken;

/// Waits for Ctrl-C or, on unix, `SIGTERM`, then cancels `token`. In-flight
/// scans are abandoned at their next checkpoint rather than awaited — the
/// process exits as soon as the signal fires.
pub async fn wait_for_shutdown(token: CancellationToken) {
  #[cfg(unix)]
  {
    let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(sig) => sig,
      Err(e) => {
        tracing::warn!("failed to install SIGTERM handler: {e}");
        let _ = tokio::signal::ctrl_c().await;
        token.cancel();
        return;
      }
    };
    tokio::select! {
      _ = tokio::signal::ctrl_c() => tracing::info!("received Ctrl-C"),
      _ = term.recv() => tracing::info!("received SIGTERM"),
    }
  }
  #[cfg(not(unix))]
  {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received Ctrl-C");
  }

  token.cancel();
}

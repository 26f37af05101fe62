use std::path::PathBuf;

use clap::Parser;

/// Media indexing daemon: discovers storage devices, walks their file trees,
/// extracts metadata, and keeps the document database synchronized.
#[derive(Debug, Parser)]
#[command(name = "mindexer", version, about)]
pub struct Cli {
  /// Path to the ambient TOML config (`mindexer.toml`). Defaults to the
  /// resolved config directory when omitted.
  #[arg(long, value_name = "PATH")]
  pub config: Option<PathBuf>,

  /// Path to the extension table (`extensions.json`). Defaults to the
  /// resolved config directory when omitted.
  #[arg(long, value_name = "PATH")]
  pub extensions: Option<PathBuf>,

  /// Overrides `RUST_LOG` when set. One of `error`, `warn`, `info`, `debug`,
  /// `trace`, or any `tracing-subscriber` filter directive.
  #[arg(long, value_name = "LEVEL")]
  pub log_level: Option<String>,
}

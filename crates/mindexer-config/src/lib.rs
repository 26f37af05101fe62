mod backend;
mod configurator;
mod model;
mod paths;

pub use backend::{ConfigBackend, TomlConfigBackend};
pub use configurator::Configurator;
pub use model::{DbConfig, ExtractConfig, FsConfig, StorageConfig};
pub use paths::{ConfigError, Paths};

use once_cell::sync::Lazy;

pub static PATHS: Lazy<Paths> = Lazy::new(|| Paths::detect().expect("failed to resolve mindexer paths"));
pub static CONFIG_BACKEND: Lazy<TomlConfigBackend> = Lazy::new(|| TomlConfigBackend::new(PATHS.clone()));

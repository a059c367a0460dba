// ABOUTME: Command implementations behind the CLI subcommands
// ABOUTME: Exports sync and tenants, plus the shared config loader

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;

pub mod sync;
pub mod tenants;

pub use sync::{sync, SyncOptions};
pub use tenants::tenants;

/// Load the configuration file.
///
/// An explicit path must exist. Without one, `tenant-sync.toml` in the
/// working directory is used when present, otherwise an empty configuration.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let default = Config::default_path();
            if default.exists() {
                Config::load(&default)
                    .with_context(|| format!("Failed to load config from {}", default.display()))
            } else {
                tracing::debug!("No {} found, using defaults", default.display());
                Ok(Config::default())
            }
        }
    }
}

//! Command implementations

pub mod check;
pub mod digest;
pub mod platform;
pub mod status;

use anyhow::{Context, Result};
use camino::Utf8Path;
use patchup::{SettingsLoader, UpdateConfig, UpdaterSettings};
use tracing::debug;

use crate::cli::TargetArgs;

/// Command name used when neither flags nor settings name one
pub const DEFAULT_CMD_NAME: &str = "patchup";

/// Load settings from `config_path` (if any) plus environment overrides
pub fn load_settings(config_path: Option<&Utf8Path>) -> Result<UpdaterSettings> {
    let loader = match config_path {
        Some(path) => SettingsLoader::with_path(path.to_path_buf()),
        None => SettingsLoader::new(),
    };

    let settings = loader.load().context("Failed to load updater settings")?;
    debug!(path = ?loader.path(), settings = ?settings, "Loaded updater settings");
    Ok(settings)
}

/// Build the update configuration for `target`
///
/// Flags win over settings; without either this binary updates itself.
pub fn build_config(settings: &UpdaterSettings, target: &TargetArgs) -> Result<UpdateConfig> {
    let cmd_name = target
        .cmd_name
        .as_deref()
        .unwrap_or_else(|| settings.cmd_name_or(DEFAULT_CMD_NAME));
    let current_version = target
        .current_version
        .as_deref()
        .unwrap_or(env!("CARGO_PKG_VERSION"));

    let mut config = settings
        .to_config(cmd_name, current_version)
        .context("Invalid updater settings")?;

    if let Some(executable) = &target.executable {
        config = config.with_executable_path(executable.as_std_path());
    }

    Ok(config)
}

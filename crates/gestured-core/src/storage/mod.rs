mod config;

pub use config::{EngineConfig, ThresholdConfig, TimingConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/gestured[-dev]/` based on GESTURED_ENV.
///
/// Set GESTURED_ENV=dev to use the development config directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("GESTURED_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("gestured-dev")
    } else {
        base_dir.join("gestured")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DirectoryUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

use gestured_core::{ConfigError, EngineConfig};
use std::path::Path;

pub mod config;
pub mod replay;
pub mod status;

/// Load `path` when given, otherwise the config at the default location.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    match path {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    }
}

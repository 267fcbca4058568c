//! TOML-based engine configuration.
//!
//! Holds the tunables the detectors read at construction:
//! - Stow dwell-time bounds and the doze pulse cooldown
//! - The IR proximity "near" threshold
//! - Default settings for the in-memory settings store used by replay
//!
//! Configuration is stored at `~/.config/gestured/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::detector::{StowTiming, DEFAULT_PROXIMITY_NEAR_CM};
use crate::error::ConfigError;
use crate::power::DEFAULT_PULSE_COOLDOWN_MS;
use crate::settings::SettingsSnapshot;

/// Timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_handwave_max_delta_ns")]
    pub handwave_max_delta_ns: i64,
    #[serde(default = "default_pocket_min_delta_ns")]
    pub pocket_min_delta_ns: i64,
    #[serde(default = "default_pulse_cooldown_ms")]
    pub pulse_cooldown_ms: i64,
}

/// Sensor threshold configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_proximity_near_cm")]
    pub proximity_near_cm: f32,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/gestured/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Initial values for the in-memory settings store.
    #[serde(default)]
    pub defaults: SettingsSnapshot,
}

// Default functions
fn default_handwave_max_delta_ns() -> i64 {
    StowTiming::default().handwave_max_delta_ns
}
fn default_pocket_min_delta_ns() -> i64 {
    StowTiming::default().pocket_min_delta_ns
}
fn default_pulse_cooldown_ms() -> i64 {
    DEFAULT_PULSE_COOLDOWN_MS
}
fn default_proximity_near_cm() -> f32 {
    DEFAULT_PROXIMITY_NEAR_CM
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            handwave_max_delta_ns: default_handwave_max_delta_ns(),
            pocket_min_delta_ns: default_pocket_min_delta_ns(),
            pulse_cooldown_ms: default_pulse_cooldown_ms(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            proximity_near_cm: default_proximity_near_cm(),
        }
    }
}

impl TimingConfig {
    pub fn stow_timing(&self) -> StowTiming {
        StowTiming {
            handwave_max_delta_ns: self.handwave_max_delta_ns,
            pocket_min_delta_ns: self.pocket_min_delta_ns,
        }
    }
}

impl EngineConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Whole sections are not assignable.
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: EngineConfig = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.handwave_max_delta_ns <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "timing.handwave_max_delta_ns".into(),
                message: "must be positive".into(),
            });
        }
        if self.timing.pocket_min_delta_ns < self.timing.handwave_max_delta_ns {
            return Err(ConfigError::InvalidValue {
                key: "timing.pocket_min_delta_ns".into(),
                message: "must not be below timing.handwave_max_delta_ns".into(),
            });
        }
        if self.timing.pulse_cooldown_ms < 0 {
            return Err(ConfigError::InvalidValue {
                key: "timing.pulse_cooldown_ms".into(),
                message: "must not be negative".into(),
            });
        }
        let near = self.thresholds.proximity_near_cm;
        if near.is_nan() || near <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "thresholds.proximity_near_cm".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The config is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: EngineConfig =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.timing.handwave_max_delta_ns, 1_000_000_000);
        assert_eq!(cfg.timing.pocket_min_delta_ns, 5_000_000_000);
        assert_eq!(cfg.timing.pulse_cooldown_ms, 1_500);
        assert_eq!(cfg.thresholds.proximity_near_cm, 5.0);
        assert!(cfg.defaults.pocket);
        assert!(!cfg.defaults.always_on_enabled);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.get("timing.pulse_cooldown_ms").as_deref(), Some("1500"));
        assert_eq!(cfg.get("defaults.gesture_pocket"), None);
        assert_eq!(cfg.get("defaults.pocket").as_deref(), Some("true"));
        assert!(cfg.get("timing.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_nested_bool_and_number() {
        let mut cfg = EngineConfig::default();
        cfg.set("defaults.double_tap", "true").unwrap();
        cfg.set("timing.pulse_cooldown_ms", "0").unwrap();
        cfg.set("thresholds.proximity_near_cm", "3.5").unwrap();
        assert!(cfg.defaults.double_tap);
        assert_eq!(cfg.timing.pulse_cooldown_ms, 0);
        assert_eq!(cfg.thresholds.proximity_near_cm, 3.5);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = EngineConfig::default();
        assert!(matches!(
            cfg.set("timing.nonexistent_key", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("timing", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.set("defaults.pocket", "not_a_bool").is_err());
        assert!(cfg.set("timing.pulse_cooldown_ms", "soon").is_err());
        assert!(cfg.set("timing.pulse_cooldown_ms", "1.5").is_err());
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn set_rejects_inverted_thresholds() {
        let mut cfg = EngineConfig::default();
        let result = cfg.set("timing.pocket_min_delta_ns", "10");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        assert_eq!(cfg.timing.pocket_min_delta_ns, 5_000_000_000);
    }

    #[test]
    fn save_and_load_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = EngineConfig::default();
        cfg.set("defaults.flip_to_mute", "true").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EngineConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timing = 3").unwrap();
        assert!(matches!(
            EngineConfig::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}

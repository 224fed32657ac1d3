//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Defaults for newly added timers
//! - Gesture thresholds
//! - Frame poll cadence
//! - Database location override
//!
//! Configuration is stored at `~/.config/timerdeck/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::gesture::GestureConfig;

/// Defaults applied to timers created by "add timer".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerDefaults {
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: f64,
    #[serde(default = "default_timer_name")]
    pub default_name: String,
    #[serde(default)]
    pub show_decimals: bool,
    #[serde(default = "default_true")]
    pub alarm_enabled: bool,
}

/// Frame loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file; `~/.config/timerdeck/timerdeck.db` when unset.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/timerdeck/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timers: TimerDefaults,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

// Default functions
fn default_duration_secs() -> f64 {
    300.0
}
fn default_timer_name() -> String {
    "Timer".into()
}
fn default_true() -> bool {
    true
}
fn default_frame_interval_ms() -> u64 {
    100
}

impl Default for TimerDefaults {
    fn default() -> Self {
        Self {
            default_duration_secs: default_duration_secs(),
            default_name: default_timer_name(),
            show_decimals: false,
            alarm_enabled: true,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl Config {
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
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Optional fields serialize as null; accept any string.
                    serde_json::Value::Null | serde_json::Value::String(_) => {
                        serde_json::Value::String(value.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, creating it with defaults when missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
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

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if the key is
    /// unknown or the result fails validation; `self` is unchanged then.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check value ranges the types alone don't enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };
        if !(750..=1000).contains(&self.gesture.long_press_ms) {
            return invalid("gesture.long_press_ms", "must be between 750 and 1000");
        }
        if self.gesture.move_threshold <= 0.0 {
            return invalid("gesture.move_threshold", "must be positive");
        }
        if self.gesture.max_offset <= 0.0 {
            return invalid("gesture.max_offset", "must be positive");
        }
        if self.gesture.commit_threshold <= self.gesture.move_threshold {
            return invalid(
                "gesture.commit_threshold",
                "must be larger than gesture.move_threshold",
            );
        }
        if !self.timers.default_duration_secs.is_finite() || self.timers.default_duration_secs < 0.0
        {
            return invalid("timers.default_duration_secs", "must not be negative");
        }
        if self.timers.default_name.trim().is_empty() {
            return invalid("timers.default_name", "must not be empty");
        }
        if self.poll.frame_interval_ms == 0 {
            return invalid("poll.frame_interval_ms", "must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let parsed: Config = toml::from_str("[gesture]\nlong_press_ms = 900\n").unwrap();
        assert_eq!(parsed.gesture.long_press_ms, 900);
        assert_eq!(parsed.gesture.commit_threshold, 100.0);
        assert_eq!(parsed.timers.default_duration_secs, 300.0);
        assert_eq!(parsed.poll.frame_interval_ms, 100);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("gesture.long_press_ms").as_deref(), Some("800"));
        assert_eq!(cfg.get("timers.default_name").as_deref(), Some("Timer"));
        assert!(cfg.get("gesture.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("timers.show_decimals", "true").unwrap();
        cfg.set("gesture.long_press_ms", "950").unwrap();
        cfg.set("timers.default_duration_secs", "90.5").unwrap();
        cfg.set("storage.database_path", "/tmp/deck.db").unwrap();
        assert!(cfg.timers.show_decimals);
        assert_eq!(cfg.gesture.long_press_ms, 950);
        assert_eq!(cfg.timers.default_duration_secs, 90.5);
        assert_eq!(
            cfg.storage.database_path.as_deref(),
            Some(Path::new("/tmp/deck.db"))
        );
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("gesture.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("timers.show_decimals", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_rejects_out_of_range_long_press() {
        let mut cfg = Config::default();
        assert!(cfg.set("gesture.long_press_ms", "300").is_err());
        assert_eq!(cfg.gesture.long_press_ms, 800);
    }

    #[test]
    fn load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("poll.frame_interval_ms", "16").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().poll.frame_interval_ms, 16);
    }
}

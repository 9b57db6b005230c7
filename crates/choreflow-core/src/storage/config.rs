//! TOML-based application configuration.
//!
//! Stores tunables for:
//! - The approval workflow (self-approval policy)
//! - The daily streak check (grace period override)
//! - The streak history ledger (capacity)
//!
//! Configuration is stored at `~/.config/choreflow/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Approval workflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkflowConfig {
    /// Let a user approve or reject their own completion.
    #[serde(default)]
    pub allow_self_approval: bool,
}

/// Streak engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StreakConfig {
    /// Fixed day count used by the daily check instead of the
    /// frequency-derived grace period.
    #[serde(default)]
    pub daily_check_grace_days: Option<u32>,
}

/// Streak history ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryConfig {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/choreflow/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub streak: StreakConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
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

    fn parse_scalar(key: &str, existing: &serde_json::Value, value: &str) -> Result<serde_json::Value, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        // Clearing is decided before the existing type: an optional setting
        // that currently holds a number must still be unsettable. Required
        // settings reject the null when the config is rebuilt.
        if value.is_empty() || value == "none" || value == "null" {
            return Ok(serde_json::Value::Null);
        }

        match existing {
            serde_json::Value::Bool(_) => value
                .parse::<bool>()
                .map(serde_json::Value::Bool)
                .map_err(|e| invalid(e.to_string())),
            serde_json::Value::Number(_) => value
                .parse::<u64>()
                .map(|n| serde_json::Value::Number(n.into()))
                .map_err(|_| invalid(format!("cannot parse '{value}' as number"))),
            // Optional settings are unset until first written.
            serde_json::Value::Null => {
                if let Ok(n) = value.parse::<u64>() {
                    Ok(serde_json::Value::Number(n.into()))
                } else if let Ok(b) = value.parse::<bool>() {
                    Ok(serde_json::Value::Bool(b))
                } else {
                    Ok(serde_json::Value::String(value.into()))
                }
            }
            _ => Ok(serde_json::Value::String(value.into())),
        }
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                if existing.is_object() {
                    return Err(ConfigError::UnknownKey(key.to_string()));
                }

                let new_value = Self::parse_scalar(key, existing, value)?;
                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, creating it with defaults when missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Set a config value by key. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist or the value cannot be
    /// parsed into the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "history.capacity".to_string(),
                message: "capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Flattened `key = value` listing of every setting.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert!(!cfg.workflow.allow_self_approval);
        assert_eq!(cfg.streak.daily_check_grace_days, None);
        assert_eq!(cfg.history.capacity, 1000);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: Config = toml::from_str("[workflow]\nallow_self_approval = true\n").unwrap();
        assert!(cfg.workflow.allow_self_approval);
        assert_eq!(cfg.history.capacity, 1000);
    }

    #[test]
    fn get_and_set_by_path() {
        let mut cfg = Config::default();
        cfg.set("workflow.allow_self_approval", "true").unwrap();
        assert_eq!(cfg.get("workflow.allow_self_approval").as_deref(), Some("true"));

        cfg.set("history.capacity", "50").unwrap();
        assert_eq!(cfg.history.capacity, 50);

        cfg.set("streak.daily_check_grace_days", "4").unwrap();
        assert_eq!(cfg.streak.daily_check_grace_days, Some(4));
        cfg.set("streak.daily_check_grace_days", "none").unwrap();
        assert_eq!(cfg.streak.daily_check_grace_days, None);
    }

    #[test]
    fn optional_setting_can_be_cleared_and_set_again() {
        let mut cfg = Config::default();
        for clear in ["none", "null", ""] {
            cfg.set("streak.daily_check_grace_days", "7").unwrap();
            assert_eq!(cfg.get("streak.daily_check_grace_days").as_deref(), Some("7"));
            cfg.set("streak.daily_check_grace_days", clear).unwrap();
            assert_eq!(cfg.streak.daily_check_grace_days, None);
        }
    }

    #[test]
    fn required_setting_cannot_be_cleared() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("history.capacity", "none"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("workflow.allow_self_approval", "null"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.history.capacity, 1000);
    }

    #[test]
    fn set_rejects_unknown_and_invalid() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("workflow.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("history.capacity", "lots"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("history.capacity", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.history.capacity, 1000);
    }

    #[test]
    fn load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("history.capacity", "10").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().history.capacity, 10);
    }

    #[test]
    fn entries_are_flattened() {
        let entries = Config::default().entries();
        assert!(entries.contains(&("history.capacity".to_string(), "1000".to_string())));
        assert!(entries.contains(&(
            "workflow.allow_self_approval".to_string(),
            "false".to_string()
        )));
    }
}

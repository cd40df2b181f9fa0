//! TOML-based application configuration.
//!
//! Stores:
//! - Backend URL and anonymous key
//! - The cached signed-in user id
//! - Notification preferences mirrored from the profile
//! - Display smoothing
//!
//! Configuration is stored at `~/.config/medminder/config.toml`. The access
//! token is kept in the OS keyring, never here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::data_dir;
use crate::brightness::DEFAULT_ALPHA;
use crate::error::{ConfigError, Result};
use crate::prefs::{NotificationPreferences, PreferenceStore};

/// Remote backend connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_alpha")]
    pub brightness_alpha: f64,
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            brightness_alpha: default_alpha(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/medminder/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub notifications: NotificationPreferences,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Optional keys left out of the serialized form while unset.
const OPTIONAL_KEYS: &[(&str, &str)] = &[("session", "user_id")];

impl Config {
    /// JSON view of the config with every known key present; unset
    /// optional values are `null`.
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut json = serde_json::to_value(self)?;
        for (section, field) in OPTIONAL_KEYS {
            if let Some(obj) = json.get_mut(*section).and_then(|v| v.as_object_mut()) {
                obj.entry(field.to_string()).or_insert(serde_json::Value::Null);
            }
        }
        Ok(json)
    }

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

        let (parent, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        for part in parent.into_iter().flat_map(|p| p.split('.')) {
            current = current.get_mut(part).ok_or_else(unknown)?;
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
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
            serde_json::Value::Object(_) => return Err(unknown()),
            serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
        match value {
            serde_json::Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    Self::flatten(&key, v, out);
                }
            }
            serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
            serde_json::Value::Null => out.push((prefix.to_string(), String::new())),
            other => out.push((prefix.to_string(), other.to_string())),
        }
    }

    /// `~/.config/medminder[-dev]/config.toml`
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
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

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key. An unset optional
    /// value reads as an empty string.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = self.to_json().ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key. An empty value clears an optional
    /// string. Nothing is written to disk.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = self.to_json().map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }

    /// All leaf keys with their values, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = self.to_json() {
            Self::flatten("", &json, &mut out);
        }
        out.sort();
        out
    }
}

/// [`PreferenceStore`] persisted in the config file.
///
/// Every write saves the file immediately.
pub struct ConfigStore {
    path: PathBuf,
    config: Mutex<Config>,
}

impl ConfigStore {
    pub fn open() -> Result<Self, ConfigError> {
        Self::open_at(Config::path()?)
    }

    pub fn open_at(path: PathBuf) -> Result<Self, ConfigError> {
        let config = Config::load_from(&path)?;
        Ok(Self {
            path,
            config: Mutex::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.lock().clone()
    }

    /// Mutate and save.
    pub fn update<T>(
        &self,
        f: impl FnOnce(&mut Config) -> Result<T, ConfigError>,
    ) -> Result<T, ConfigError> {
        let mut config = self.lock();
        let mut next = config.clone();
        let out = f(&mut next)?;
        next.save_to(&self.path)?;
        *config = next;
        Ok(out)
    }
}

impl PreferenceStore for ConfigStore {
    fn user_id(&self) -> Option<String> {
        self.lock().session.user_id.clone()
    }

    fn set_user_id(&self, user_id: Option<&str>) -> Result<()> {
        self.update(|c| {
            c.session.user_id = user_id.map(str::to_string);
            Ok(())
        })?;
        Ok(())
    }

    fn notification_preferences(&self) -> NotificationPreferences {
        self.lock().notifications
    }

    fn set_notification_preferences(&self, prefs: &NotificationPreferences) -> Result<()> {
        self.update(|c| {
            c.notifications = *prefs;
            Ok(())
        })?;
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
        assert_eq!(parsed.notifications.reminder_minutes, 15);
    }

    #[test]
    fn partial_file_uses_field_defaults() {
        let cfg: Config = toml::from_str("[notifications]\nenabled = false\n").unwrap();
        assert!(!cfg.notifications.enabled);
        assert!(cfg.notifications.sound);
        assert_eq!(cfg.display.brightness_alpha, DEFAULT_ALPHA);
        assert!(cfg.session.user_id.is_none());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("notifications.reminder_minutes").as_deref(), Some("15"));
        assert!(cfg.get("notifications.missing").is_none());
        assert!(cfg.get("notifications").is_none());
    }

    #[test]
    fn unset_optional_key_reads_empty() {
        let mut cfg = Config::default();
        assert_eq!(cfg.get("session.user_id").as_deref(), Some(""));
        assert!(cfg
            .entries()
            .contains(&("session.user_id".to_string(), String::new())));
        cfg.set("session.user_id", "u1").unwrap();
        assert_eq!(cfg.get("session.user_id").as_deref(), Some("u1"));
        assert!(cfg.get("session.token").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("notifications.reminder_minutes", "30").unwrap();
        cfg.set("notifications.sound", "false").unwrap();
        cfg.set("backend.url", "https://example.supabase.co").unwrap();
        cfg.set("display.brightness_alpha", "0.5").unwrap();
        assert_eq!(cfg.notifications.reminder_minutes, 30);
        assert!(!cfg.notifications.sound);
        assert_eq!(cfg.backend.url, "https://example.supabase.co");
        assert_eq!(cfg.display.brightness_alpha, 0.5);
    }

    #[test]
    fn set_and_clear_optional_user_id() {
        let mut cfg = Config::default();
        cfg.set("session.user_id", "u1").unwrap();
        assert_eq!(cfg.session.user_id.as_deref(), Some("u1"));
        cfg.set("session.user_id", "").unwrap();
        assert!(cfg.session.user_id.is_none());
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("notifications.volume", "3"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("notifications.enabled", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(cfg.set("backend", "x"), Err(ConfigError::UnknownKey(_))));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn entries_list_every_leaf() {
        let keys: Vec<_> = Config::default().entries().into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"backend.url".to_string()));
        assert!(keys.contains(&"notifications.vibration".to_string()));
        assert!(keys.contains(&"display.brightness_alpha".to_string()));
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "notifications = [").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::LoadFailed { .. })));
    }

    #[test]
    fn config_store_persists_preference_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let store = ConfigStore::open_at(path.clone()).unwrap();
        store.set_user_id(Some("u1")).unwrap();
        store
            .set_notification_preferences(&NotificationPreferences {
                enabled: false,
                reminder_minutes: 5,
                sound: true,
                vibration: false,
            })
            .unwrap();

        let reopened = ConfigStore::open_at(path).unwrap();
        assert_eq!(reopened.user_id().as_deref(), Some("u1"));
        assert!(!reopened.notifications_enabled());
        assert_eq!(reopened.reminder_minutes(), 5);

        reopened.set_user_id(None).unwrap();
        assert!(reopened.user_id().is_none());
    }
}

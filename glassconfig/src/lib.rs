//! # Glass-parts configuration module
//!
//! This module provides configuration management for the glass-parts gateway:
//! - Loading configuration from a YAML file
//! - Merging with the embedded default configuration
//! - Environment variable overrides
//! - Typed getters and setters for configuration values
//! - Lazily-loaded shared instance
//!
//! ## Usage
//!
//! ```no_run
//! use glassconfig::get_config;
//!
//! let config = get_config();
//! let timeout = config.get_request_timeout_secs()?;
//! config.set_max_concurrency(8)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("glassparts.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> = Arc::new(Config::load_or_default(""));
}

const ENV_CONFIG_DIR: &str = "GLASSPARTS_CONFIG";
const ENV_PREFIX: &str = "GLASSPARTS_CONFIG__";
const CONFIG_DIR_NAME: &str = ".glassparts";

// Default values for configuration
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_MAX_ATTEMPTS: usize = 1;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n
                    .as_u64()
                    .and_then(|v| usize::try_from(v).ok())
                    .unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: usize) -> Result<()> {
            let n = Number::from(value as u64);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for u64 values with default
macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<u64> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().unwrap_or($default)),
                Ok(Value::String(s)) => Ok(s.trim().parse().unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Configuration manager for the gateway
///
/// Holds the merged YAML tree. Values are read and written by path
/// (`&["gateway", "timeout_secs"]`); keys are case-insensitive.
///
/// # Examples
///
/// ```no_run
/// use glassconfig::get_config;
///
/// let config = get_config();
/// let concurrency = config.get_max_concurrency()?;
/// println!("Fan-out limit: {}", concurrency);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

// Implémentation manuelle de Clone
impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Finds a config directory by trying different locations in order
    ///
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `GLASSPARTS_CONFIG` environment variable
    /// 3. `.glassparts` in the current directory
    /// 4. `.glassparts` in the user's home directory
    pub fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external `config.yaml` file if present
    /// 4. Applies `GLASSPARTS_CONFIG__*` environment variable overrides
    ///
    /// Nothing is written to disk; call [`Config::save`] explicitly.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let external = match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path, "Loaded config file");
                Some(serde_yaml::from_slice::<Value>(&data)?)
            }
            Err(_) => {
                info!(config_file = %path, "Config file not found, using default embedded config");
                None
            }
        };

        let mut config = Self::from_parts(config_dir, path, external.as_ref())?;
        config.apply_overrides(env::vars());
        Ok(config)
    }

    /// Builds a configuration from a YAML document merged over the embedded defaults
    ///
    /// No environment override is applied. Mostly useful for tests and embedding.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let external: Value = serde_yaml::from_str(yaml)?;
        Self::from_parts(String::new(), String::new(), Some(&external))
    }

    /// Builds a configuration holding only the embedded defaults
    pub fn defaults() -> Result<Self> {
        Self::from_parts(String::new(), String::new(), None)
    }

    fn load_or_default(directory: &str) -> Self {
        match Self::load_config(directory) {
            Ok(config) => config,
            Err(err) => {
                warn!("Failed to load configuration: {}, using embedded defaults", err);
                Self::from_parts(String::new(), String::new(), None).unwrap_or_else(|_| Config {
                    config_dir: String::new(),
                    path: String::new(),
                    data: Mutex::new(Value::Mapping(Mapping::new())),
                })
            }
        }
    }

    fn from_parts(config_dir: String, path: String, external: Option<&Value>) -> Result<Self> {
        let mut value = Self::lower_keys_value(serde_yaml::from_str(DEFAULT_CONFIG)?);
        if let Some(external) = external {
            merge_yaml(&mut value, &Self::lower_keys_value(external.clone()));
        }

        Ok(Config {
            config_dir,
            path,
            data: Mutex::new(value),
        })
    }

    /// Applies `GLASSPARTS_CONFIG__A__B=value` style overrides
    ///
    /// Variables without the prefix are ignored. Values are parsed as YAML
    /// scalars, so `GLASSPARTS_CONFIG__GATEWAY__MAX_CONCURRENCY=8` sets a number.
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut data = self.data();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(err) = Self::set_value_internal(&mut data, &key_path, yaml_value) {
                    warn!(variable = %key, "Ignoring configuration override: {}", err);
                }
            }
        }
    }

    /// Directory the configuration was loaded from
    pub fn config_dir(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the `config.yaml` file
    pub fn save(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(anyhow!("Configuration was not loaded from a directory"));
        }
        if let Some(parent) = Path::new(&self.path).parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path (in memory)
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["gateway", "timeout_secs"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data();
        Self::set_value_internal(&mut data, path, value)
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        let Some((first, rest)) = path.split_first() else {
            *data = value;
            return Ok(());
        };
        if let Value::Mapping(map) = data {
            let key_value = Value::String(first.to_lowercase());
            if rest.is_empty() {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, rest, value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(&Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    /// Gets a non-empty string value, `None` when missing, empty or not a scalar
    ///
    /// Numbers and booleans are rendered as strings, so an override such as
    /// `GLASSPARTS_CONFIG__ACCOUNTS__STOCK_SERVICE__USER_ID=42` is still readable.
    pub fn get_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Ok(Value::Number(n)) => Some(n.to_string()),
            Ok(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Gets the configured SOAP endpoint, if any
    pub fn get_service_url(&self) -> Option<String> {
        self.get_string(&["gateway", "service_url"])
    }

    /// Sets the SOAP endpoint
    pub fn set_service_url(&self, url: &str) -> Result<()> {
        self.set_value(&["gateway", "service_url"], Value::String(url.to_string()))
    }

    impl_u64_config!(
        get_request_timeout_secs,
        set_request_timeout_secs,
        &["gateway", "timeout_secs"],
        DEFAULT_REQUEST_TIMEOUT_SECS
    );

    impl_usize_config!(
        get_max_concurrency,
        set_max_concurrency,
        &["gateway", "max_concurrency"],
        DEFAULT_MAX_CONCURRENCY
    );

    impl_usize_config!(
        get_max_attempts,
        set_max_attempts,
        &["gateway", "max_attempts"],
        DEFAULT_MAX_ATTEMPTS
    );

    impl_u64_config!(
        get_retry_base_delay_ms,
        set_retry_base_delay_ms,
        &["gateway", "retry_base_delay_ms"],
        DEFAULT_RETRY_BASE_DELAY_MS
    );
}

/// Returns the shared configuration instance
///
/// The instance is loaded on first access. A configuration that cannot be read
/// falls back to the embedded defaults.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings, keys from `external` are merged into `default`
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::defaults().unwrap();
        assert_eq!(config.get_request_timeout_secs().unwrap(), 30);
        assert_eq!(config.get_max_concurrency().unwrap(), 4);
        assert_eq!(config.get_max_attempts().unwrap(), 1);
        assert!(config.get_service_url().is_none());
    }

    #[test]
    fn test_external_yaml_is_merged() {
        let config = Config::from_yaml_str(
            "Gateway:\n  Timeout_Secs: 10\naccounts:\n  stock_service:\n    login: tech\n",
        )
        .unwrap();

        assert_eq!(config.get_request_timeout_secs().unwrap(), 10);
        // Les valeurs absentes du fichier gardent leur défaut
        assert_eq!(config.get_max_concurrency().unwrap(), 4);
        assert_eq!(
            config.get_string(&["accounts", "stock_service", "login"]),
            Some("tech".to_string())
        );
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::defaults().unwrap();
        config.apply_overrides(vec![
            (
                "GLASSPARTS_CONFIG__GATEWAY__MAX_CONCURRENCY".to_string(),
                "8".to_string(),
            ),
            (
                "GLASSPARTS_CONFIG__ACCOUNTS__STOCK_SERVICE__USER_ID".to_string(),
                "1234".to_string(),
            ),
            ("UNRELATED".to_string(), "x".to_string()),
        ]);

        assert_eq!(config.get_max_concurrency().unwrap(), 8);
        assert_eq!(
            config.get_string(&["accounts", "stock_service", "user_id"]),
            Some("1234".to_string())
        );
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_yaml_str("gateway:\n  timeout_secs: soon\n").unwrap();
        assert_eq!(config.get_request_timeout_secs().unwrap(), 30);
    }

    #[test]
    fn test_missing_path() {
        let config = Config::defaults().unwrap();
        assert!(config.get_value(&["nope", "never"]).is_err());
        assert!(config.get_string(&["accounts", "stock_service", "login"]).is_none());
    }

    #[test]
    fn test_load_and_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_string_lossy().to_string();
        std::fs::write(
            dir.path().join("config.yaml"),
            "gateway:\n  service_url: https://stock.test/pdaservice.asmx\n",
        )
        .unwrap();

        let config = Config::load_config(&dir_str).unwrap();
        assert_eq!(
            config.get_service_url(),
            Some("https://stock.test/pdaservice.asmx".to_string())
        );

        config.set_max_attempts(3).unwrap();
        config.save().unwrap();

        let reloaded = Config::load_config(&dir_str).unwrap();
        assert_eq!(reloaded.get_max_attempts().unwrap(), 3);
    }

    #[test]
    fn test_save_without_directory_fails() {
        let config = Config::defaults().unwrap();
        assert!(config.save().is_err());
    }
}

//! Configuration management for `issue_tracker`.
//!
//! Values are collected into string-keyed [`ConfigLayer`]s and merged in
//! precedence order (lowest to highest):
//!
//! 1. Built-in defaults
//! 2. YAML file (`--config <path>` or `./issues.yaml`)
//! 3. Environment (`ISSUES_*`, `DATABASE_URL`)
//! 4. CLI flags
//!
//! The merged layer is then resolved into a typed [`ServerConfig`]; every
//! parse or range failure surfaces there as `IssueTrackerError::Config`.

use crate::error::{IssueTrackerError, Result};
use crate::storage::StorageOptions;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "issues.yaml";

const ENV_PREFIX: &str = "ISSUES_";

/// Read by clap for `--config`, not a config key.
const CONFIG_PATH_ENV: &str = "ISSUES_CONFIG";

const KNOWN_KEYS: [&str; 7] = [
    "bind",
    "db",
    "read-pool-size",
    "busy-timeout-ms",
    "default-limit",
    "max-limit",
    "log-json",
];

/// A set of configuration values from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from explicit `(name, value)` pairs.
    ///
    /// `ISSUES_DB` beats `DATABASE_URL` when both are set.
    #[must_use]
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        let mut database_url = None;

        for (key, value) in vars {
            if key == CONFIG_PATH_ENV {
                continue;
            }
            if key == "DATABASE_URL" {
                database_url = Some(value);
            } else if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                insert_key_value(&mut layer, stripped, value);
            }
        }

        if let Some(url) = database_url {
            layer.values.entry("db".to_string()).or_insert(url);
        }

        layer
    }

    /// Keys no setting reads, sorted. Logged by the caller once logging is up.
    #[must_use]
    pub fn unknown_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .values
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_KEYS.contains(key))
            .collect();
        keys.sort_unstable();
        keys
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Values supplied as command-line flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub db: Option<PathBuf>,
    pub read_pool_size: Option<usize>,
    pub busy_timeout_ms: Option<u64>,
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
    pub log_json: Option<bool>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(bind) = &self.bind {
            insert_key_value(&mut layer, "bind", bind.clone());
        }
        if let Some(path) = &self.db {
            insert_key_value(&mut layer, "db", path.to_string_lossy().to_string());
        }
        if let Some(size) = self.read_pool_size {
            insert_key_value(&mut layer, "read-pool-size", size.to_string());
        }
        if let Some(ms) = self.busy_timeout_ms {
            insert_key_value(&mut layer, "busy-timeout-ms", ms.to_string());
        }
        if let Some(limit) = self.default_limit {
            insert_key_value(&mut layer, "default-limit", limit.to_string());
        }
        if let Some(limit) = self.max_limit {
            insert_key_value(&mut layer, "max-limit", limit.to_string());
        }
        if let Some(json) = self.log_json {
            insert_key_value(&mut layer, "log-json", json.to_string());
        }

        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    for (key, value) in [
        ("bind", "0.0.0.0:8000"),
        ("db", "./issues.db"),
        ("read-pool-size", "4"),
        ("busy-timeout-ms", "5000"),
        ("default-limit", "100"),
        ("max-limit", "100"),
        ("log-json", "false"),
    ] {
        layer.values.insert(key.to_string(), value.to_string());
    }
    layer
}

/// Load configuration with the full precedence chain.
///
/// An explicit `config_path` must exist; the implicit `./issues.yaml` is
/// optional.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub fn load_config(config_path: Option<&Path>, cli: &CliOverrides) -> Result<ConfigLayer> {
    let yaml = match config_path {
        Some(path) if !path.exists() => {
            return Err(IssueTrackerError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Some(path) => ConfigLayer::from_yaml(path)?,
        None => ConfigLayer::from_yaml(Path::new(DEFAULT_CONFIG_FILE))?,
    };

    Ok(ConfigLayer::merge_layers(&[
        default_config_layer(),
        yaml,
        ConfigLayer::from_env(),
        cli.as_layer(),
    ]))
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub read_pool_size: usize,
    pub busy_timeout: Duration,
    /// `limit` applied to list requests that omit it.
    pub default_limit: usize,
    /// Largest `limit` a list request may ask for.
    pub max_limit: usize,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            db_path: PathBuf::from("./issues.db"),
            read_pool_size: 4,
            busy_timeout: Duration::from_millis(5_000),
            default_limit: 100,
            max_limit: 100,
            log_json: false,
        }
    }
}

impl ServerConfig {
    /// Resolve a merged layer into typed settings. Keys absent from the
    /// layer keep their built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns `IssueTrackerError::Config` for unparseable values or
    /// inconsistent limits.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let defaults = Self::default();

        let bind = match layer.get("bind") {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .map_err(|_| config_error("bind", raw, "expected host:port"))?,
            None => defaults.bind,
        };
        let db_path = match layer.get("db") {
            Some(raw) => parse_db_location(raw)?,
            None => defaults.db_path,
        };
        let read_pool_size = parse_number(layer, "read-pool-size")?.unwrap_or(defaults.read_pool_size);
        let busy_timeout = parse_number::<u64>(layer, "busy-timeout-ms")?
            .map_or(defaults.busy_timeout, Duration::from_millis);
        let default_limit = parse_number(layer, "default-limit")?.unwrap_or(defaults.default_limit);
        let max_limit = parse_number(layer, "max-limit")?.unwrap_or(defaults.max_limit);
        let log_json = match layer.get("log-json") {
            Some(raw) => parse_bool(raw).ok_or_else(|| config_error("log-json", raw, "expected true or false"))?,
            None => defaults.log_json,
        };

        let config = Self {
            bind,
            db_path,
            read_pool_size,
            busy_timeout,
            default_limit,
            max_limit,
            log_json,
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.read_pool_size == 0 {
            return Err(IssueTrackerError::Config(
                "read-pool-size must be at least 1".to_string(),
            ));
        }
        if self.default_limit == 0 || self.max_limit == 0 {
            return Err(IssueTrackerError::Config(
                "default-limit and max-limit must be at least 1".to_string(),
            ));
        }
        if self.default_limit > self.max_limit {
            return Err(IssueTrackerError::Config(format!(
                "default-limit ({}) exceeds max-limit ({})",
                self.default_limit, self.max_limit
            )));
        }
        Ok(())
    }

    /// Connection pool settings for [`crate::storage::SqliteStorage::open`].
    #[must_use]
    pub const fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            read_pool_size: self.read_pool_size,
            busy_timeout: self.busy_timeout,
        }
    }
}

/// Accept either a filesystem path or a `sqlite:///path` URL.
///
/// `sqlite:///./issues.db` is relative, `sqlite:////var/lib/issues.db` is
/// absolute.
///
/// # Errors
///
/// Returns `IssueTrackerError::Config` for non-SQLite URLs or an empty path.
pub fn parse_db_location(raw: &str) -> Result<PathBuf> {
    let raw = raw.trim();
    if let Some(path) = raw.strip_prefix("sqlite:///") {
        if path.is_empty() {
            return Err(config_error("db", raw, "URL has no file path"));
        }
        return Ok(PathBuf::from(path));
    }
    if raw.contains("://") {
        return Err(config_error("db", raw, "only sqlite:/// URLs are supported"));
    }
    Ok(PathBuf::from(raw))
}

fn insert_key_value(layer: &mut ConfigLayer, key: &str, value: String) {
    layer.values.insert(normalize_key(key), value);
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(['_', '.'], "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(layer: &ConfigLayer, key: &str) -> Result<Option<T>> {
    layer
        .get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| config_error(key, raw, "expected a non-negative integer"))
        })
        .transpose()
}

fn config_error(key: &str, value: &str, expected: &str) -> IssueTrackerError {
    IssueTrackerError::Config(format!("invalid {key} '{value}': {expected}"))
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        insert_key_value(&mut layer, &key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}

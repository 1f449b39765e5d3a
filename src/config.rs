//! Configuration for azmon-rules
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/azmon-rules/config.toml)
//! - User configuration (~/.azmon-rules.toml)
//! - Project configuration (./azmon-rules.toml)
//! - Environment variables
//!
//! Later sources win. Files may be TOML, YAML or JSON.

use crate::provider::{ProviderFeatures, ResourceTimeouts};
use crate::telemetry::{LogLevel, LoggingConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public Azure Resource Manager endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// State file used when none is configured
pub const DEFAULT_STATE_FILE: &str = "azmon-rules.state.json";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resource Manager connection settings
    pub azure: AzureConfig,

    /// Provider behaviour switches
    pub features: ProviderFeatures,

    /// Per-phase handler deadlines
    pub timeouts: ResourceTimeouts,

    /// Logging settings
    pub logging: LoggingConfig,

    /// State file settings
    pub state: StateConfig,
}

/// The `[azure]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    /// Resource Manager endpoint
    pub endpoint: String,

    /// Subscription every rule lives in
    pub subscription_id: Option<String>,

    /// Bearer token for Resource Manager
    pub access_token: Option<String>,

    /// Timeout for a single HTTP request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Retries for throttled or failed requests
    pub max_retries: u32,

    /// Base delay between retries, multiplied by the attempt number
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
            subscription_id: None,
            access_token: None,
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// The `[state]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Path of the JSON state file
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let paths: Vec<PathBuf> = Self::get_config_paths(config_path)
            .into_iter()
            .filter(|path| path.exists())
            .collect();

        let mut config = Self::from_layers(&paths)?;
        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path takes priority
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = vec![PathBuf::from("/etc/azmon-rules/config.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".azmon-rules.toml"));
        }

        paths.push(PathBuf::from("azmon-rules.toml"));

        if let Ok(env_config) = std::env::var("AZMON_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Overlay each file on the defaults in order. A key present in a later
    /// file replaces the earlier value, even when it matches the default.
    fn from_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = Value::Object(Map::new());

        for path in paths {
            overlay(&mut merged, read_layer(path)?);
        }

        serde_json::from_value(merged).context("Invalid configuration")
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(subscription) = std::env::var("ARM_SUBSCRIPTION_ID") {
            self.azure.subscription_id = Some(subscription);
        }

        if let Ok(token) = std::env::var("ARM_ACCESS_TOKEN") {
            self.azure.access_token = Some(token);
        }

        if let Ok(endpoint) = std::env::var("ARM_ENDPOINT") {
            self.azure.endpoint = endpoint;
        }

        if let Ok(value) = std::env::var("ARM_RESOURCES_MUST_BE_IMPORTED") {
            self.features.resources_must_be_imported = parse_bool(&value).with_context(|| {
                format!("Invalid ARM_RESOURCES_MUST_BE_IMPORTED value '{}'", value)
            })?;
        }

        if let Ok(level) = std::env::var("AZMON_LOG_LEVEL") {
            self.logging.level = level
                .parse::<LogLevel>()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid AZMON_LOG_LEVEL")?;
        }

        if let Ok(path) = std::env::var("AZMON_STATE_FILE") {
            self.state.path = PathBuf::from(path);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.logging.ansi_colors = false;
        }

        Ok(())
    }

    /// Subscription id, required for any remote call
    pub fn subscription_id(&self) -> Result<&str> {
        self.azure
            .subscription_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("No subscription configured: set ARM_SUBSCRIPTION_ID or azure.subscription_id")
    }

    /// Load from a specific file only, without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_layers(&[path.as_ref().to_path_buf()])
    }
}

/// Parse one config file into a document holding only the keys it sets.
fn read_layer(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let layer: Value = match extension {
        "yml" | "yaml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        _ => toml::from_str(&content)
            .or_else(|_| serde_yaml::from_str(&content))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
    };

    // an empty YAML file parses to null
    let layer = if layer.is_null() { Value::Object(Map::new()) } else { layer };

    Config::deserialize(&layer)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    Ok(layer)
}

fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::LogFormat;
    use serial_test::serial;
    use std::io::Write;

    const ENV_VARS: &[&str] = &[
        "ARM_SUBSCRIPTION_ID",
        "ARM_ACCESS_TOKEN",
        "ARM_ENDPOINT",
        "ARM_RESOURCES_MUST_BE_IMPORTED",
        "AZMON_LOG_LEVEL",
        "AZMON_STATE_FILE",
        "AZMON_CONFIG",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.azure.endpoint, DEFAULT_ARM_ENDPOINT);
        assert_eq!(config.azure.max_retries, 3);
        assert!(config.features.resources_must_be_imported);
        assert_eq!(config.timeouts.read, Duration::from_secs(300));
        assert_eq!(config.state.path, PathBuf::from(DEFAULT_STATE_FILE));
    }

    #[test]
    #[serial]
    fn test_load_toml_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.toml",
            r#"
[azure]
subscription_id = "00000000-0000-0000-0000-000000000000"
request_timeout = "30s"
max_retries = 5

[features]
resources_must_be_imported = false

[timeouts]
create = "10m"

[logging]
level = "debug"
format = "json"

[state]
path = "/tmp/rules.json"
"#,
        );

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.subscription_id().unwrap(),
            "00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(config.azure.request_timeout, Duration::from_secs(30));
        assert_eq!(config.azure.max_retries, 5);
        assert!(!config.features.resources_must_be_imported);
        assert_eq!(config.timeouts.create, Duration::from_secs(600));
        assert_eq!(config.timeouts.delete, Duration::from_secs(1800));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.state.path, PathBuf::from("/tmp/rules.json"));
    }

    #[test]
    #[serial]
    fn test_load_yaml_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.yaml",
            "azure:\n  endpoint: http://localhost:8080\n  access_token: abc\n",
        );

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.azure.endpoint, "http://localhost:8080");
        assert_eq!(config.azure.access_token.as_deref(), Some("abc"));
    }

    #[test]
    #[serial]
    fn test_invalid_file_is_error() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "config.toml", "[azure\nendpoint = ");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_later_file_keeps_unset_earlier_values() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_file(
            &dir,
            "first.toml",
            "[azure]\nsubscription_id = \"sub-a\"\nmax_retries = 7\n",
        );
        let second = write_file(&dir, "second.yaml", "azure:\n  endpoint: http://other\n");

        let config = Config::from_layers(&[first, second]).unwrap();
        assert_eq!(config.azure.subscription_id.as_deref(), Some("sub-a"));
        assert_eq!(config.azure.max_retries, 7);
        assert_eq!(config.azure.endpoint, "http://other");
    }

    #[test]
    fn test_later_file_can_restore_default() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_file(
            &dir,
            "first.toml",
            "[features]\nresources_must_be_imported = false\n\n[azure]\nmax_retries = 9\n",
        );
        let second = write_file(
            &dir,
            "second.toml",
            "[features]\nresources_must_be_imported = true\n\n[azure]\nmax_retries = 3\n",
        );

        let config = Config::from_layers(&[first, second]).unwrap();
        assert!(config.features.resources_must_be_imported);
        assert_eq!(config.azure.max_retries, 3);
    }

    #[test]
    #[serial]
    fn test_explicit_config_overrides_home_config() {
        clear_env();
        let home = tempfile::tempdir().unwrap();
        write_file(
            &home,
            ".azmon-rules.toml",
            "[features]\nresources_must_be_imported = false\n",
        );
        let env_file = write_file(
            &home,
            "override.toml",
            "[features]\nresources_must_be_imported = true\n",
        );

        let old_home = std::env::var_os("HOME");
        std::env::set_var("HOME", home.path());
        std::env::set_var("AZMON_CONFIG", &env_file);
        let config = Config::load(None);
        match old_home {
            Some(value) => std::env::set_var("HOME", value),
            None => std::env::remove_var("HOME"),
        }
        clear_env();

        assert!(config.unwrap().features.resources_must_be_imported);
    }

    #[test]
    fn test_invalid_value_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.toml", "[azure]\nmax_retries = \"many\"\n");
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        clear_env();
        std::env::set_var("ARM_SUBSCRIPTION_ID", "sub-env");
        std::env::set_var("ARM_RESOURCES_MUST_BE_IMPORTED", "false");
        std::env::set_var("AZMON_LOG_LEVEL", "trace");

        let mut config = Config::default();
        config.apply_env_overrides().unwrap();
        clear_env();

        assert_eq!(config.subscription_id().unwrap(), "sub-env");
        assert!(!config.features.resources_must_be_imported);
        assert_eq!(config.logging.level, LogLevel::Trace);
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_bad_bool() {
        clear_env();
        std::env::set_var("ARM_RESOURCES_MUST_BE_IMPORTED", "maybe");
        let mut config = Config::default();
        let result = config.apply_env_overrides();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_subscription() {
        let config = Config::default();
        assert!(config.subscription_id().is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub watcher: WatcherConfig,
    pub logging: LoggingConfig,
}

/// Node connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL of the node
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Poll period in milliseconds
    pub poll_interval_ms: u64,
    /// Path of the home/foreign bridge configuration document
    pub bridge_config_path: String,
    /// Path of the bridge contract ABI (bare array or Truffle artifact)
    pub abi_path: String,
    /// Capacity of the channel between the poller and its consumer
    pub event_channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            bridge_config_path: "./config.json".to_string(),
            abi_path: "./truffle/build/contracts/Bridge.json".to_string(),
            event_channel_capacity: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    /// Environment variables take precedence over file values
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the TOML file named by `CONFIG_FILE`, defaults if absent
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "watcher.toml".to_string());
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &str) -> Result<Self, ConfigError> {
        if !Path::new(config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = env::var("BRIDGE_RPC_URL") {
            self.rpc.endpoint = endpoint;
        }
        if let Ok(timeout) = env::var("RPC_TIMEOUT_SECONDS") {
            self.rpc.timeout_seconds = parse_env("RPC_TIMEOUT_SECONDS", timeout)?;
        }

        if let Ok(interval) = env::var("POLL_INTERVAL_MS") {
            self.watcher.poll_interval_ms = parse_env("POLL_INTERVAL_MS", interval)?;
        }
        if let Ok(path) = env::var("BRIDGE_CONFIG_PATH") {
            self.watcher.bridge_config_path = path;
        }
        if let Ok(path) = env::var("BRIDGE_ABI_PATH") {
            self.watcher.abi_path = path;
        }
        if let Ok(capacity) = env::var("EVENT_CHANNEL_CAPACITY") {
            self.watcher.event_channel_capacity = parse_env("EVENT_CHANNEL_CAPACITY", capacity)?;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpc.endpoint.starts_with("http://") && !self.rpc.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.rpc.endpoint.clone()));
        }

        if self.rpc.timeout_seconds == 0 || self.rpc.timeout_seconds > 300 {
            return Err(invalid("rpc.timeout_seconds", self.rpc.timeout_seconds));
        }

        // Sub-10ms polling would hammer the node without observing new blocks
        if self.watcher.poll_interval_ms < 10 || self.watcher.poll_interval_ms > 300_000 {
            return Err(invalid("watcher.poll_interval_ms", self.watcher.poll_interval_ms));
        }

        if self.watcher.event_channel_capacity == 0 {
            return Err(invalid("watcher.event_channel_capacity", self.watcher.event_channel_capacity));
        }

        if self.watcher.bridge_config_path.trim().is_empty() {
            return Err(invalid("watcher.bridge_config_path", &self.watcher.bridge_config_path));
        }

        if self.watcher.abi_path.trim().is_empty() {
            return Err(invalid("watcher.abi_path", &self.watcher.abi_path));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid("logging.level", &self.logging.level));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(invalid("logging.format", &self.logging.format));
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default())
            .map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

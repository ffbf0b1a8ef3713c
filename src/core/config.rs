//! Configuration management for the exporter.
//!
//! Configuration is layered:
//! - YAML file support
//! - Environment variable overrides (through the CLI)
//! - CLI argument overrides
//! - Validation and defaults

use crate::core::sanitize;
use crate::core::{ExporterError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Fixed scrape path.
pub const METRICS_PATH: &str = "/metrics";

/// Health probe path.
pub const HEALTH_PATH: &str = "/health";

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Sample store configuration
    pub store: StoreConfig,
    /// Label rewriting
    pub labels: LabelConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Verbose (debug) logging, CLI only
    #[serde(skip)]
    pub verbose: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen_address: SocketAddr,
    /// Path scollector posts to
    pub put_path: String,
    /// Maximum accepted request body size (compressed)
    pub max_body_bytes: usize,
    /// Maximum size of a gzip body once decompressed
    pub max_decoded_bytes: usize,
}

/// Sample store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long a sample is valid for
    #[serde(with = "humantime_serde")]
    pub sample_expiry: Duration,
    /// How often expired samples are garbage collected
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Capacity of the ingestion handoff queue
    pub queue_capacity: usize,
    /// Longest a request waits on a full handoff queue before dropping
    #[serde(with = "humantime_serde")]
    pub handoff_timeout: Duration,
}

/// Label rewriting configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Labels renamed after sanitization, in application order
    pub replace: Vec<LabelReplacement>,
}

/// A single `from:to` label rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelReplacement {
    /// Label name as received (after sanitization)
    pub from: String,
    /// Label name exposed to Prometheus
    pub to: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 9107)),
            put_path: "/api/put".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
            max_decoded_bytes: 128 * 1024 * 1024,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            sample_expiry: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
            queue_capacity: 4096,
            handoff_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
        }
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl LabelReplacement {
    /// Parse a comma separated list of `old:new` pairs, e.g.
    /// `instance:deployment_name,one:two`. Empty entries are ignored.
    pub fn parse_list(spec: &str) -> Result<Vec<LabelReplacement>> {
        spec.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (from, to) = entry.split_once(':').ok_or_else(|| {
                    ExporterError::config(format!(
                        "Invalid label replacement '{}': expected old:new",
                        entry
                    ))
                })?;
                Ok(LabelReplacement {
                    from: from.trim().to_string(),
                    to: to.trim().to_string(),
                })
            })
            .collect()
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let path = &self.server.put_path;
        if !path.starts_with('/') {
            return Err(ExporterError::config(format!(
                "Ingestion path must start with '/', got '{}'",
                path
            )));
        }
        if path == METRICS_PATH || path == HEALTH_PATH {
            return Err(ExporterError::config(format!(
                "Ingestion path cannot be {}",
                path
            )));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ExporterError::config("max_body_bytes must be greater than 0"));
        }
        if self.server.max_decoded_bytes == 0 {
            return Err(ExporterError::config("max_decoded_bytes must be greater than 0"));
        }

        if self.store.sample_expiry.is_zero() {
            return Err(ExporterError::config("sample_expiry must be greater than 0"));
        }
        if self.store.sweep_interval.is_zero() {
            return Err(ExporterError::config("sweep_interval must be greater than 0"));
        }
        if self.store.queue_capacity == 0 {
            return Err(ExporterError::config("queue_capacity must be greater than 0"));
        }
        if self.store.handoff_timeout.is_zero() {
            return Err(ExporterError::config("handoff_timeout must be greater than 0"));
        }

        for replacement in &self.labels.replace {
            for name in [&replacement.from, &replacement.to] {
                if !sanitize::is_valid_label_name(name) {
                    return Err(ExporterError::config(format!(
                        "Invalid label name '{}' in replacement {}:{}",
                        name, replacement.from, replacement.to
                    )));
                }
            }
        }

        Ok(())
    }

    /// Effective log filter
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            LogLevel::Debug.as_str()
        } else {
            self.logging.level.as_str()
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| ExporterError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set listen address
    pub fn listen_address(mut self, addr: SocketAddr) -> Self {
        self.config.server.listen_address = addr;
        self
    }

    /// Set ingestion path
    pub fn put_path(mut self, path: impl Into<String>) -> Self {
        self.config.server.put_path = path.into();
        self
    }

    /// Set sample expiry
    pub fn sample_expiry(mut self, expiry: Duration) -> Self {
        self.config.store.sample_expiry = expiry;
        self
    }

    /// Set sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.store.sweep_interval = interval;
        self
    }

    /// Set handoff queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.store.queue_capacity = capacity;
        self
    }

    /// Replace the label rewrite list from an `old:new,...` string
    pub fn replace_labels(mut self, spec: &str) -> Result<Self> {
        self.config.labels.replace = LabelReplacement::parse_list(spec)?;
        Ok(self)
    }

    /// Set verbose mode
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//! Command-line interface for the exporter.
//!
//! Flag names follow the scollector exporter conventions
//! (`--scollector.prefix`, `--http`, ...), every flag can also be set
//! through a `SCOLLECTOR_EXPORTER_*` environment variable.

use crate::application::Application;
use crate::core::config::ConfigBuilder;
use crate::core::{Config, ExporterError, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Accepts scollector metrics over HTTP and exposes them to Prometheus
#[derive(Parser, Debug, Default)]
#[command(name = "scollector-exporter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on
    #[arg(long = "http", env = "SCOLLECTOR_EXPORTER_HTTP")]
    pub http: Option<SocketAddr>,

    /// Path scollector posts metrics to
    #[arg(long = "scollector.prefix", env = "SCOLLECTOR_EXPORTER_PREFIX")]
    pub prefix: Option<String>,

    /// How long a sample is valid for (e.g. 5m, 90s)
    #[arg(
        long = "scollector.sample-expiry",
        env = "SCOLLECTOR_EXPORTER_SAMPLE_EXPIRY",
        value_parser = humantime::parse_duration
    )]
    pub sample_expiry: Option<Duration>,

    /// Label renames, comma separated old:new pairs (e.g. instance:deployment_name)
    #[arg(long = "replace-label", env = "SCOLLECTOR_EXPORTER_REPLACE_LABEL")]
    pub replace_label: Option<String>,

    /// Configuration file path (default: ~/.config/scollector-exporter/config.yaml)
    #[arg(short, long, env = "SCOLLECTOR_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "SCOLLECTOR_EXPORTER_VERBOSE")]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments and environment variables
    /// 2. Config file
    /// 3. Defaults
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return self.build_config_from_args(builder),
            },
        };

        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                builder = builder.from_yaml(&content)?;
                tracing::info!("Loaded configuration from: {:?}", config_path);
            },
            Err(e) if self.config.is_some() => {
                return Err(ExporterError::config(format!(
                    "Failed to read config file {:?}: {}",
                    config_path, e
                )));
            },
            Err(_) => {
                tracing::debug!("No config file found at {:?}, using defaults", config_path);
            },
        }

        self.build_config_from_args(builder)
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<Config> {
        if let Some(addr) = self.http {
            builder = builder.listen_address(addr);
        }
        if let Some(prefix) = &self.prefix {
            builder = builder.put_path(prefix.as_str());
        }
        if let Some(expiry) = self.sample_expiry {
            builder = builder.sample_expiry(expiry);
        }
        if let Some(spec) = &self.replace_label {
            builder = builder.replace_labels(spec)?;
        }

        builder.verbose(self.verbose).build()
    }

    /// Initialize logging. `RUST_LOG` wins over the configured level.
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| ExporterError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Default configuration file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scollector-exporter").join("config.yaml"))
}

/// Execute the exporter.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    cli.init_logging(&config)?;

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Listen address: {}", config.server.listen_address);
        println!("  Ingestion path: {}", config.server.put_path);
        println!(
            "  Sample expiry: {}",
            humantime::format_duration(config.store.sample_expiry)
        );
        println!("  Label renames: {}", config.labels.replace.len());
        return Ok(());
    }

    tracing::info!("Starting scollector exporter");
    let app = Application::new(config)?;
    if let Err(e) = app.run().await {
        tracing::error!(category = e.category(), "{}", e);
        return Err(e);
    }
    Ok(())
}

//! Configuration system tests.

use scollector_exporter::cli::Cli;
use scollector_exporter::core::config::LogLevel;
use scollector_exporter::core::{Config, ConfigBuilder};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.listen_address, "0.0.0.0:9107".parse().unwrap());
    assert_eq!(config.server.put_path, "/api/put");
    assert_eq!(config.store.sample_expiry, Duration::from_secs(300));
    assert!(config.labels.replace.is_empty());
}

#[test]
fn test_config_builder() {
    let config = ConfigBuilder::new()
        .listen_address("127.0.0.1:9999".parse().unwrap())
        .put_path("/put")
        .sample_expiry(Duration::from_secs(30))
        .queue_capacity(16)
        .verbose(true)
        .build()
        .unwrap();

    assert_eq!(config.server.listen_address.port(), 9999);
    assert_eq!(config.server.put_path, "/put");
    assert_eq!(config.store.sample_expiry, Duration::from_secs(30));
    assert_eq!(config.store.queue_capacity, 16);
    assert!(config.verbose);
}

#[test]
fn test_config_validation() {
    assert!(ConfigBuilder::new().put_path("").build().is_err());
    assert!(ConfigBuilder::new().put_path("/metrics").build().is_err());
    assert!(ConfigBuilder::new().sample_expiry(Duration::ZERO).build().is_err());
    assert!(ConfigBuilder::new()
        .replace_labels("instance:bad-name")
        .unwrap()
        .build()
        .is_err());
}

#[test]
fn test_yaml_rejects_unknown_level() {
    let yaml = "logging:\n  level: loud\n";
    assert!(ConfigBuilder::new().from_yaml(yaml).is_err());
}

#[tokio::test]
async fn test_config_file_with_cli_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
server:
  put_path: /from/file
store:
  sample_expiry: 10m
labels:
  replace:
    - from: instance
      to: node
logging:
  level: warn
"#
    )
    .unwrap();

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        sample_expiry: Some(Duration::from_secs(120)),
        ..Cli::default()
    };
    let config = cli.load_config().await.unwrap();

    assert_eq!(config.server.put_path, "/from/file");
    assert_eq!(config.store.sample_expiry, Duration::from_secs(120));
    assert_eq!(config.labels.replace[0].to, "node");
    assert_eq!(config.logging.level, LogLevel::Warn);
}

#[tokio::test]
async fn test_invalid_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "server: [not, a, map]").unwrap();

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Cli::default()
    };
    assert!(cli.load_config().await.is_err());
}

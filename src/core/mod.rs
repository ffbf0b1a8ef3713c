//! Core domain types, configuration and errors.
//!
//! Everything here is free of I/O: the HTTP surface and the store owner
//! task build on top of these types.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, LabelReplacement, HEALTH_PATH, METRICS_PATH};
pub use error::{ExporterError, Result};
pub use types::{DataPoint, Labels, Sample, SeriesKind};

//! scollector exporter - bridge OpenTSDB pushes into a Prometheus scrape.
//!
//! scollector agents push batches of data points to `/api/put`. The exporter
//! keeps the latest sample of every series for a bounded time and renders
//! them in the Prometheus text format on `/metrics`.
//!
//! # Architecture
//!
//! - `core`: domain types, configuration, errors and name sanitization
//! - `receiver`: request decoding, label rewriting and the HTTP surface
//! - `store`: concurrent, time-bounded sample store with a single owner task
//! - `export`: text exposition rendering
//! - `monitoring`: ingestion counters and the liveness timestamp
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use scollector_exporter::core::Config;
//! use scollector_exporter::Application;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let app = Application::new(config)?;
//!     app.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod application;
pub mod cli;
pub mod core;
pub mod export;
pub mod monitoring;
pub mod receiver;
pub mod store;

pub use crate::application::Application;
pub use crate::core::{Config, ExporterError, Result};

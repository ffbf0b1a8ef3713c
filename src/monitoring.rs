//! Ingestion liveness tracking.
//!
//! Tracked independently of the sample store so that a scrape can tell
//! "nothing is arriving" apart from "everything that arrived is stale".

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the liveness gauge exported on every scrape.
pub const LAST_PROCESSED_METRIC: &str = "scollector_last_processed_timestamp_seconds";

/// HELP text of the liveness gauge.
pub const LAST_PROCESSED_HELP: &str = "Unix timestamp of the last processed scollector metric.";

/// Process-wide ingestion counters
#[derive(Debug, Default)]
pub struct IngestMonitor {
    /// `f64` seconds since the epoch, stored as raw bits
    last_processed: AtomicU64,
    batches_accepted: AtomicU64,
    batches_rejected: AtomicU64,
    samples_accepted: AtomicU64,
    records_dropped: AtomicU64,
}

/// Point-in-time view of the ingestion counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IngestStats {
    pub last_processed_seconds: f64,
    pub batches_accepted: u64,
    pub batches_rejected: u64,
    pub samples_accepted: u64,
    pub records_dropped: u64,
}

impl IngestMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fully processed batch and bump the liveness gauge to `now`.
    pub fn record_batch(&self, samples: usize, dropped: usize, now: SystemTime) {
        let seconds = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.last_processed.store(seconds.to_bits(), Ordering::Relaxed);
        self.batches_accepted.fetch_add(1, Ordering::Relaxed);
        self.samples_accepted.fetch_add(samples as u64, Ordering::Relaxed);
        self.records_dropped.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    /// Record a batch rejected at the transport level
    pub fn record_rejection(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Unix timestamp of the last processed batch, 0 if none yet
    pub fn last_processed(&self) -> f64 {
        f64::from_bits(self.last_processed.load(Ordering::Relaxed))
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            last_processed_seconds: self.last_processed(),
            batches_accepted: self.batches_accepted.load(Ordering::Relaxed),
            batches_rejected: self.batches_rejected.load(Ordering::Relaxed),
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }
}

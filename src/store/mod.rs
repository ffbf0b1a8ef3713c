//! Time-bounded sample store.
//!
//! The store maps series identity to the latest [`Sample`] seen for it.
//! All mutation of the mapping happens on a single owner task fed by a
//! bounded handoff queue:
//! - `put` hands a sample to the owner, waiting at most the handoff timeout
//! - the owner upserts samples and periodically sweeps expired entries
//! - readers copy the mapping under a brief lock and filter afterwards
//!
//! The type registry (metric name → type hint) lives next to the mapping
//! behind its own lock, since ingestion needs a hint to be visible to the
//! very next record of the same batch.

use crate::core::config::StoreConfig;
use crate::core::{ExporterError, Result, Sample, SeriesKind};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Messages processed by the owner task, one per loop iteration.
#[derive(Debug)]
enum StoreCommand {
    /// Upsert a sample by series identity
    Put(Sample),
    /// Acknowledge once everything queued before has been applied
    Flush(oneshot::Sender<()>),
    /// Stop the owner task
    Shutdown,
}

/// Plain series-identity → sample mapping. Not synchronized.
#[derive(Debug, Default)]
pub struct SampleMap {
    samples: HashMap<String, Sample>,
}

impl SampleMap {
    /// Create an empty map with room for `capacity` series
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: HashMap::with_capacity(capacity),
        }
    }

    /// Insert or fully replace the sample for its series.
    /// Returns the replaced sample, if any.
    pub fn upsert(&mut self, sample: Sample) -> Option<Sample> {
        self.samples.insert(sample.series_key(), sample)
    }

    /// Remove every sample older than `age_limit`, returning how many went.
    pub fn sweep(&mut self, age_limit: SystemTime) -> usize {
        let before = self.samples.len();
        self.samples.retain(|_, sample| !sample.is_stale(age_limit));
        before - self.samples.len()
    }

    /// Copy out all samples regardless of age
    pub fn copy_all(&self) -> Vec<Sample> {
        self.samples.values().cloned().collect()
    }

    /// Get the sample stored for a series identity
    pub fn get(&self, series_key: &str) -> Option<&Sample> {
        self.samples.get(series_key)
    }

    /// Number of stored series
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no series is stored
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// State shared between the owner task and store handles
#[derive(Debug)]
struct Shared {
    samples: Mutex<SampleMap>,
    types: RwLock<HashMap<String, String>>,
    expiry: RwLock<Duration>,
}

/// Oldest timestamp still considered live at `now`.
pub fn age_limit(now: SystemTime, expiry: Duration) -> SystemTime {
    now.checked_sub(expiry)
        .map_or(UNIX_EPOCH, |limit| limit.max(UNIX_EPOCH))
}

/// Cloneable handle to the sample store.
#[derive(Debug, Clone)]
pub struct SampleStore {
    shared: Arc<Shared>,
    tx: mpsc::Sender<StoreCommand>,
    handoff_timeout: Duration,
}

impl SampleStore {
    /// Create the store and spawn its owner task.
    ///
    /// The owner runs until [`SampleStore::shutdown`] is called or every
    /// handle has been dropped.
    pub fn spawn(config: &StoreConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let shared = Arc::new(Shared {
            samples: Mutex::new(SampleMap::with_capacity(512)),
            types: RwLock::new(HashMap::with_capacity(512)),
            expiry: RwLock::new(config.sample_expiry),
        });

        let handle = tokio::spawn(Self::run_owner(Arc::clone(&shared), rx, config.sweep_interval));

        tracing::debug!(
            expiry = ?config.sample_expiry,
            sweep_interval = ?config.sweep_interval,
            queue_capacity = config.queue_capacity,
            "Sample store started"
        );

        let store = Self {
            shared,
            tx,
            handoff_timeout: config.handoff_timeout,
        };
        (store, handle)
    }

    /// Owner loop: the only place the mapping is mutated outside of `sweep`.
    async fn run_owner(
        shared: Arc<Shared>,
        mut rx: mpsc::Receiver<StoreCommand>,
        sweep_interval: Duration,
    ) {
        let mut sweep = tokio::time::interval(sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        sweep.tick().await;

        loop {
            tokio::select! {
                command = rx.recv() => {
                    match command {
                        Some(StoreCommand::Put(sample)) => {
                            shared.samples.lock().upsert(sample);
                        }
                        Some(StoreCommand::Flush(ack)) => {
                            let _ = ack.send(());
                        }
                        Some(StoreCommand::Shutdown) | None => {
                            tracing::info!("Sample store owner shutting down");
                            break;
                        }
                    }
                }

                _ = sweep.tick() => {
                    let (removed, remaining) = sweep_shared(&shared, SystemTime::now());
                    if removed > 0 {
                        tracing::debug!(removed, remaining, "Garbage collected expired samples");
                    }
                }
            }
        }
    }

    /// Hand a sample to the owner task. Returns false if it was dropped.
    ///
    /// Waits for queue capacity for at most the handoff timeout. The sample
    /// is dropped with a warning if the queue stays full or the store has
    /// shut down.
    pub async fn put(&self, sample: Sample) -> bool {
        match self.tx.send_timeout(StoreCommand::Put(sample), self.handoff_timeout).await {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(_)) => {
                tracing::warn!(
                    timeout_ms = self.handoff_timeout.as_millis() as u64,
                    "Sample handoff queue full, dropping sample"
                );
                false
            },
            Err(SendTimeoutError::Closed(_)) => {
                tracing::warn!("Sample store is closed, dropping sample");
                false
            },
        }
    }

    /// Point-in-time copy of every sample still live at `now`.
    pub fn snapshot(&self, now: SystemTime) -> Vec<Sample> {
        let samples = self.shared.samples.lock().copy_all();
        let limit = age_limit(now, self.expiry());

        samples
            .into_iter()
            .filter(|sample| {
                if sample.is_stale(limit) {
                    tracing::debug!(series = %sample.series_key(), "Skipping expired sample");
                    false
                } else {
                    true
                }
            })
            .collect()
    }

    /// Delete every sample expired at `now`. Returns how many were removed.
    pub fn sweep(&self, now: SystemTime) -> usize {
        sweep_shared(&self.shared, now).0
    }

    /// Wait until every sample queued before this call has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Flush(ack_tx))
            .await
            .map_err(|_| ExporterError::StoreClosed)?;
        ack_rx.await.map_err(|_| ExporterError::StoreClosed)
    }

    /// Ask the owner task to stop. Samples queued before are still applied.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(StoreCommand::Shutdown)
            .await
            .map_err(|_| ExporterError::StoreClosed)
    }

    /// Record a type hint for a metric name. Returns true if it changed.
    pub fn record_type_hint(&self, name: &str, hint: &str) -> bool {
        if hint.is_empty() {
            return false;
        }
        let mut types = self.shared.types.write();
        match types.get(name) {
            Some(existing) if existing == hint => false,
            _ => {
                types.insert(name.to_string(), hint.to_string());
                true
            },
        }
    }

    /// Last type hint seen for a metric name
    pub fn type_annotation(&self, name: &str) -> Option<String> {
        self.shared.types.read().get(name).cloned()
    }

    /// Kind governed by the last type hint for a metric name
    pub fn kind_of(&self, name: &str) -> SeriesKind {
        SeriesKind::from_hint(self.shared.types.read().get(name).map(String::as_str))
    }

    /// Number of metric names with a type hint
    pub fn type_count(&self) -> usize {
        self.shared.types.read().len()
    }

    /// Current expiry horizon
    pub fn expiry(&self) -> Duration {
        *self.shared.expiry.read()
    }

    /// Change the expiry horizon. Applies to the next sweep and snapshot.
    pub fn set_expiry(&self, expiry: Duration) {
        *self.shared.expiry.write() = expiry;
    }

    /// Number of stored series, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.shared.samples.lock().len()
    }

    /// Returns true if no series is stored
    pub fn is_empty(&self) -> bool {
        self.shared.samples.lock().is_empty()
    }
}

fn sweep_shared(shared: &Shared, now: SystemTime) -> (usize, usize) {
    let limit = age_limit(now, *shared.expiry.read());
    let mut samples = shared.samples.lock();
    let removed = samples.sweep(limit);
    (removed, samples.len())
}

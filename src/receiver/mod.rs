//! scollector ingestion.
//!
//! Turns OpenTSDB `/api/put` batches into samples for the store. Each
//! record is handled independently: a bad record is logged and skipped,
//! it never fails the batch it arrived in.

pub mod decode;
pub mod http;
pub mod rewrite;

use crate::core::{DataPoint, Sample, SeriesKind};
use crate::monitoring::IngestMonitor;
use crate::store::SampleStore;
use rewrite::LabelRewriter;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Timestamps at or above this value carry milliseconds.
pub const MILLISECOND_THRESHOLD: i64 = 10_000_000_000;

/// Reasons a single record is skipped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("bad metric name: {0:?}")]
    BadName(String),

    #[error("unknown value type {kind} for {metric}")]
    UnsupportedValue { metric: String, kind: &'static str },

    #[error("invalid timestamp {timestamp} for {metric}")]
    BadTimestamp { metric: String, timestamp: i64 },
}

/// What a single record turned into
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// A numeric record, ready for the store
    Sample(Sample),
    /// A string value, recorded in the type registry
    TypeHint { name: String, hint: String },
    /// An empty string value, nothing to do
    Ignored,
}

/// Per-batch tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub samples: usize,
    pub type_hints: usize,
    pub dropped: usize,
}

/// Convert an OpenTSDB timestamp into a point in time.
///
/// Values of ten digits or fewer are seconds, longer ones milliseconds.
/// Non-positive timestamps are rejected.
pub fn normalize_timestamp(timestamp: i64) -> Option<SystemTime> {
    if timestamp <= 0 {
        return None;
    }
    let raw = timestamp.unsigned_abs();
    let offset = if timestamp >= MILLISECOND_THRESHOLD {
        Duration::from_millis(raw)
    } else {
        Duration::from_secs(raw)
    };
    UNIX_EPOCH.checked_add(offset)
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Ingestion pipeline shared by all request tasks
#[derive(Debug)]
pub struct Ingestor {
    store: SampleStore,
    rewriter: LabelRewriter,
    monitor: Arc<IngestMonitor>,
}

impl Ingestor {
    pub fn new(store: SampleStore, rewriter: LabelRewriter, monitor: Arc<IngestMonitor>) -> Self {
        Self {
            store,
            rewriter,
            monitor,
        }
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn monitor(&self) -> &Arc<IngestMonitor> {
        &self.monitor
    }

    /// Run one record through sanitize → classify → type → timestamp → labels.
    ///
    /// Type hints are written to the registry immediately so that the next
    /// record of the same batch already sees them.
    pub fn process_record(&self, point: DataPoint) -> Result<RecordOutcome, RecordError> {
        let DataPoint {
            metric,
            timestamp,
            value,
            tags,
        } = point;

        let name = crate::core::sanitize::metric_name(&metric);
        if name.is_empty() {
            return Err(RecordError::BadName(metric));
        }

        let value = match value {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(v) => v,
                None => {
                    return Err(RecordError::UnsupportedValue {
                        metric,
                        kind: "number",
                    })
                },
            },
            serde_json::Value::String(hint) => {
                if hint.is_empty() {
                    return Ok(RecordOutcome::Ignored);
                }
                if self.store.record_type_hint(&name, &hint) {
                    tracing::debug!(metric = %name, hint = %hint, "Type hint updated");
                }
                return Ok(RecordOutcome::TypeHint { name, hint });
            },
            other => {
                return Err(RecordError::UnsupportedValue {
                    metric,
                    kind: value_kind(&other),
                })
            },
        };

        // One registry read so kind and help always agree
        let annotation = self.store.type_annotation(&name);
        let kind = SeriesKind::from_hint(annotation.as_deref());
        let Some(observed) = normalize_timestamp(timestamp) else {
            return Err(RecordError::BadTimestamp { metric, timestamp });
        };
        let labels = self.rewriter.rewrite(tags);
        let help = format!(
            "Scollector metric {} ({})",
            metric,
            annotation.unwrap_or_default()
        );

        Ok(RecordOutcome::Sample(Sample {
            name,
            labels,
            help,
            value,
            kind,
            timestamp: observed,
        }))
    }

    /// Process every record of a decoded batch and hand samples to the store.
    pub async fn ingest(&self, batch: Vec<DataPoint>) -> BatchSummary {
        tracing::debug!(size = batch.len(), "batch");

        let mut summary = BatchSummary::default();
        for point in batch {
            tracing::debug!(metric = %point.metric, timestamp = point.timestamp, "got");
            match self.process_record(point) {
                Ok(RecordOutcome::Sample(sample)) => {
                    if self.store.put(sample).await {
                        summary.samples += 1;
                    } else {
                        summary.dropped += 1;
                    }
                },
                Ok(RecordOutcome::TypeHint { .. }) => summary.type_hints += 1,
                Ok(RecordOutcome::Ignored) => {},
                Err(e) => {
                    tracing::warn!("Skipping record: {}", e);
                    summary.dropped += 1;
                },
            }
        }

        self.monitor
            .record_batch(summary.samples, summary.dropped, SystemTime::now());
        tracing::info!(
            messages = summary.samples,
            dropped = summary.dropped,
            samples = self.store.len(),
            types = self.store.type_count(),
            "processed"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{LabelReplacement, StoreConfig};
    use serde_json::json;
    use std::collections::HashMap;

    fn ingestor(replace: &str) -> Ingestor {
        let (store, _handle) = SampleStore::spawn(&StoreConfig::default());
        let rewriter = LabelRewriter::new(&LabelReplacement::parse_list(replace).unwrap());
        Ingestor::new(store, rewriter, Arc::new(IngestMonitor::new()))
    }

    fn point(metric: &str, timestamp: i64, value: serde_json::Value, tags: &[(&str, &str)]) -> DataPoint {
        DataPoint {
            metric: metric.to_string(),
            timestamp,
            value,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_normalize_seconds() {
        assert_eq!(
            normalize_timestamp(1_500_000_000),
            Some(UNIX_EPOCH + Duration::from_secs(1_500_000_000))
        );
    }

    #[test]
    fn test_normalize_milliseconds() {
        assert_eq!(
            normalize_timestamp(1_500_000_000_123),
            Some(UNIX_EPOCH + Duration::from_millis(1_500_000_000_123))
        );
        assert_eq!(
            normalize_timestamp(MILLISECOND_THRESHOLD),
            Some(UNIX_EPOCH + Duration::from_secs(10_000_000))
        );
    }

    #[test]
    fn test_normalize_rejects_non_positive() {
        assert_eq!(normalize_timestamp(0), None);
        assert_eq!(normalize_timestamp(-5), None);
    }

    #[tokio::test]
    async fn test_numeric_record_becomes_sample() {
        let ingestor = ingestor("");
        let outcome = ingestor
            .process_record(point("os.cpu", 1_500_000_000, json!(12), &[("host", "web01")]))
            .unwrap();

        let RecordOutcome::Sample(sample) = outcome else {
            panic!("expected a sample, got {:?}", outcome);
        };
        assert_eq!(sample.name, "os_cpu");
        assert_eq!(sample.value, 12.0);
        assert_eq!(sample.kind, SeriesKind::Gauge);
        assert_eq!(sample.help, "Scollector metric os.cpu ()");
        assert_eq!(sample.labels.get("instance").map(String::as_str), Some("web01"));
        assert!(!sample.labels.contains_key("host"));
    }

    #[tokio::test]
    async fn test_type_hint_then_value() {
        let ingestor = ingestor("");
        let hint = ingestor
            .process_record(point("x", 1_500_000_000, json!("counter"), &[]))
            .unwrap();
        assert_eq!(
            hint,
            RecordOutcome::TypeHint {
                name: "x".to_string(),
                hint: "counter".to_string()
            }
        );

        let RecordOutcome::Sample(sample) = ingestor
            .process_record(point("x", 1_500_000_000, json!(5), &[]))
            .unwrap()
        else {
            panic!("expected a sample");
        };
        assert_eq!(sample.kind, SeriesKind::Counter);
        assert_eq!(sample.help, "Scollector metric x (counter)");
    }

    #[tokio::test]
    async fn test_empty_hint_is_ignored() {
        let ingestor = ingestor("");
        assert_eq!(
            ingestor.process_record(point("x", 1, json!(""), &[])).unwrap(),
            RecordOutcome::Ignored
        );
        assert_eq!(ingestor.store().type_count(), 0);
    }

    #[tokio::test]
    async fn test_record_errors() {
        let ingestor = ingestor("");
        assert_eq!(
            ingestor.process_record(point("", 1, json!(1), &[])),
            Err(RecordError::BadName(String::new()))
        );
        assert_eq!(
            ingestor.process_record(point("flag", 1, json!(true), &[])),
            Err(RecordError::UnsupportedValue {
                metric: "flag".to_string(),
                kind: "bool"
            })
        );
        assert_eq!(
            ingestor.process_record(point("cpu", 0, json!(1), &[])),
            Err(RecordError::BadTimestamp {
                metric: "cpu".to_string(),
                timestamp: 0
            })
        );
    }

    #[tokio::test]
    async fn test_ingest_partial_failure() {
        let ingestor = ingestor("");
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;

        let summary = ingestor
            .ingest(vec![
                point("good", now, json!(1.5), &[]),
                point("bad", now, json!(false), &[]),
                point("good", now, json!("gauge"), &[]),
            ])
            .await;
        ingestor.store().flush().await.unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                samples: 1,
                type_hints: 1,
                dropped: 1
            }
        );
        assert_eq!(ingestor.store().len(), 1);
        assert!(ingestor.monitor().last_processed() > 0.0);
        assert_eq!(ingestor.monitor().stats().records_dropped, 1);
    }

    #[tokio::test]
    async fn test_configured_rename_in_pipeline() {
        let ingestor = ingestor("old:new");
        let RecordOutcome::Sample(sample) = ingestor
            .process_record(point("m", 1_500_000_000, json!(1), &[("old", "v")]))
            .unwrap()
        else {
            panic!("expected a sample");
        };
        assert_eq!(sample.labels.get("new").map(String::as_str), Some("v"));
        assert!(!sample.labels.contains_key("old"));
    }

    #[tokio::test]
    async fn test_samples_dropped_by_closed_store_are_not_accepted() {
        let ingestor = ingestor("");
        ingestor.store().shutdown().await.unwrap();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;

        let summary = ingestor.ingest(vec![point("cpu", now, json!(1), &[])]).await;

        assert_eq!(
            summary,
            BatchSummary {
                samples: 0,
                type_hints: 0,
                dropped: 1
            }
        );
        assert!(ingestor.store().is_empty());
        assert_eq!(ingestor.monitor().stats().samples_accepted, 0);
        assert_eq!(ingestor.monitor().stats().records_dropped, 1);
    }
}

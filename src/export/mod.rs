//! Prometheus text exposition of the sample store.
//!
//! Every scrape copies the store, drops samples older than the expiry
//! horizon (independently of the background sweep) and renders one family
//! per metric name. The liveness gauge is always rendered first, so a scrape
//! of an empty or fully expired store still succeeds.

use crate::core::{Sample, SeriesKind};
use crate::monitoring::{IngestMonitor, LAST_PROCESSED_HELP, LAST_PROCESSED_METRIC};
use crate::store::SampleStore;
use std::sync::Arc;
use std::time::SystemTime;

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders scrapes from the store and the ingestion monitor
#[derive(Debug, Clone)]
pub struct Exporter {
    store: SampleStore,
    monitor: Arc<IngestMonitor>,
}

impl Exporter {
    pub fn new(store: SampleStore, monitor: Arc<IngestMonitor>) -> Self {
        Self { store, monitor }
    }

    /// Render the exposition text for a scrape happening at `now`.
    pub fn scrape(&self, now: SystemTime) -> String {
        let samples = self.store.snapshot(now);
        tracing::debug!(samples = samples.len(), stored = self.store.len(), "Collect");
        render_exposition(samples, self.monitor.last_processed())
    }
}

/// Render samples plus the liveness gauge in the text exposition format.
///
/// Families are sorted by name and series by labels. When samples of one
/// name disagree on kind or help, the most recent sample decides.
pub fn render_exposition(mut samples: Vec<Sample>, last_processed: f64) -> String {
    let mut out = String::with_capacity(256 + samples.len() * 96);

    push_family_header(&mut out, LAST_PROCESSED_METRIC, LAST_PROCESSED_HELP, SeriesKind::Gauge);
    out.push_str(LAST_PROCESSED_METRIC);
    out.push(' ');
    out.push_str(&format_value(last_processed));
    out.push('\n');

    samples.retain(|sample| {
        if sample.name == LAST_PROCESSED_METRIC {
            tracing::debug!("Skipping sample shadowing the liveness gauge");
            return false;
        }
        true
    });
    samples.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.labels.cmp(&b.labels)));

    let mut start = 0;
    while start < samples.len() {
        let name = samples[start].name.as_str();
        let len = samples[start..]
            .iter()
            .take_while(|sample| sample.name == name)
            .count();
        let family = &samples[start..start + len];

        if let Some(latest) = family.iter().max_by_key(|sample| sample.timestamp) {
            push_family_header(&mut out, name, &latest.help, latest.kind);
        }
        for sample in family {
            push_series(&mut out, sample);
        }

        start += len;
    }

    out
}

fn push_family_header(out: &mut String, name: &str, help: &str, kind: SeriesKind) {
    out.push_str("# HELP ");
    out.push_str(name);
    out.push(' ');
    out.push_str(&escape_help(help));
    out.push('\n');
    out.push_str("# TYPE ");
    out.push_str(name);
    out.push(' ');
    out.push_str(kind.as_str());
    out.push('\n');
}

fn push_series(out: &mut String, sample: &Sample) {
    out.push_str(&sample.name);
    if !sample.labels.is_empty() {
        out.push('{');
        for (i, (name, value)) in sample.labels.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_label_value(value));
            out.push('"');
        }
        out.push('}');
    }
    out.push(' ');
    out.push_str(&format_value(sample.value));
    out.push('\n');
}

/// Format a sample value, spelling out non-finite values the way
/// Prometheus parses them.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Escape `\`, `"` and newlines in a label value.
pub fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape `\` and newlines in HELP text.
pub fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

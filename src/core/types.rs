use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::SystemTime;

/// Label set of a series. Kept sorted so that iteration order never
/// produces two identities for one logical series.
pub type Labels = BTreeMap<String, String>;

/// Prometheus value type of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    /// Point-in-time measurement
    #[default]
    Gauge,
    /// Monotonically increasing counter
    Counter,
}

impl SeriesKind {
    /// Resolve a type hint annotation. Only `counter` is special, anything
    /// else (including `gauge` and `rate`) is exposed as a gauge.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint {
            Some("counter") => SeriesKind::Counter,
            _ => SeriesKind::Gauge,
        }
    }

    /// Exposition format `# TYPE` keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Gauge => "gauge",
            SeriesKind::Counter => "counter",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest observed value of one series
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Sanitized metric name
    pub name: String,
    /// Sanitized and rewritten labels
    pub labels: Labels,
    /// HELP text rendered on export
    pub help: String,
    /// Observed value
    pub value: f64,
    /// Counter or gauge
    pub kind: SeriesKind,
    /// Time the value was observed by the upstream agent
    pub timestamp: SystemTime,
}

impl Sample {
    /// Canonical series identity: `name#k1=v1;k2=v2` with labels sorted by name.
    pub fn series_key(&self) -> String {
        let mut key = String::with_capacity(self.name.len() + self.labels.len() * 16);
        key.push_str(&self.name);
        key.push('#');
        for (i, (k, v)) in self.labels.iter().enumerate() {
            if i > 0 {
                key.push(';');
            }
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
        key
    }

    /// Returns true if the sample is older than `age_limit`.
    pub fn is_stale(&self, age_limit: SystemTime) -> bool {
        self.timestamp < age_limit
    }
}

/// One record of an OpenTSDB `/api/put` batch as sent by scollector.
///
/// `value` is kept as raw JSON: numbers are samples, strings are type hints,
/// everything else is rejected per record. Missing or `null` fields decode to
/// empty values so that a malformed record is skipped on its own instead of
/// failing the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Raw metric name
    #[serde(default, deserialize_with = "null_as_default")]
    pub metric: String,
    /// Seconds or milliseconds since the epoch
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,
    /// Raw value
    #[serde(default)]
    pub value: serde_json::Value,
    /// Raw tags, `null` tag values become empty strings
    #[serde(default, deserialize_with = "nullable_tags")]
    pub tags: HashMap<String, String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_tags<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags: Option<HashMap<String, Option<String>>> = Option::deserialize(deserializer)?;
    Ok(tags
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name, value.unwrap_or_default()))
        .collect())
}

//! Tag to label conversion.
//!
//! OpenTSDB tags become Prometheus labels in three passes, each walking the
//! labels in sorted name order so collisions resolve the same way every time
//! (the later name in sort order wins):
//! 1. sanitize names, moving values to the sanitized key
//! 2. rename `host` to `instance`
//! 3. apply the configured `from:to` renames

use crate::core::config::LabelReplacement;
use crate::core::sanitize;
use crate::core::Labels;
use std::collections::HashMap;

/// Tag carrying the originating machine in scollector batches.
pub const HOST_TAG: &str = "host";

/// Prometheus' canonical target label.
pub const INSTANCE_LABEL: &str = "instance";

/// Converts raw tags into exported labels
#[derive(Debug, Clone, Default)]
pub struct LabelRewriter {
    replacements: HashMap<String, String>,
}

impl LabelRewriter {
    /// Build from configured replacements. A repeated `from` keeps the last `to`.
    pub fn new(replacements: &[LabelReplacement]) -> Self {
        Self {
            replacements: replacements
                .iter()
                .map(|r| (r.from.clone(), r.to.clone()))
                .collect(),
        }
    }

    /// Number of configured renames
    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    /// Returns true if no rename is configured
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Convert raw tags into the label set of a sample.
    pub fn rewrite(&self, tags: HashMap<String, String>) -> Labels {
        let mut labels = sanitize_tags(tags);

        if labels.get(HOST_TAG).is_some_and(|host| !host.is_empty()) {
            if let Some(host) = labels.remove(HOST_TAG) {
                labels.insert(INSTANCE_LABEL.to_string(), host);
            }
        }

        if self.replacements.is_empty() {
            return labels;
        }

        let mut replaced = Labels::new();
        for (name, value) in labels {
            match self.replacements.get(&name) {
                Some(to) => {
                    replaced.insert(to.clone(), value);
                },
                None => {
                    replaced.insert(name, value);
                },
            }
        }
        replaced
    }
}

/// Sanitize every tag name, dropping tags whose name sanitizes to nothing.
fn sanitize_tags(tags: HashMap<String, String>) -> Labels {
    let mut sorted: Vec<(String, String)> = tags.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut labels = Labels::new();
    for (name, value) in sorted {
        let clean = sanitize::label_name(&name);
        if clean.is_empty() {
            tracing::warn!(label = %name, "Dropping label with empty name");
            continue;
        }
        if clean != name {
            tracing::warn!(label = %name, renamed = %clean, "Bad label name");
        }
        labels.insert(clean, value);
    }
    labels
}

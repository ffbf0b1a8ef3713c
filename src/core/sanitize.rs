//! Metric and label name sanitization.
//!
//! Prometheus names must match `[a-zA-Z_:][a-zA-Z0-9_:]*` and label names
//! `[a-zA-Z_][a-zA-Z0-9_]*`. OpenTSDB names are far more permissive
//! (`os.cpu`, `win.disk.bytes-free`), so every incoming identifier is mapped
//! character by character onto the Prometheus alphabet.

/// Placeholder used for characters that have no Prometheus equivalent.
pub const DEFAULT_PLACEHOLDER: char = 'x';

/// Map `raw` onto the Prometheus identifier alphabet.
///
/// `.` always becomes `_`. Letters and `_` are kept, digits are kept from
/// the second character on, `:` is kept only when `allow_colon` is set.
/// Anything else is replaced with `placeholder`, or removed when
/// `placeholder` is `None`.
pub fn clear_name(raw: &str, allow_colon: bool, placeholder: Option<char>) -> String {
    let mut out = String::with_capacity(raw.len());

    for (i, c) in raw.chars().enumerate() {
        let mapped = match c {
            '.' => Some('_'),
            'a'..='z' | 'A'..='Z' | '_' => Some(c),
            ':' if allow_colon => Some(c),
            '0'..='9' if i > 0 => Some(c),
            _ => placeholder,
        };
        if let Some(m) = mapped {
            out.push(m);
        }
    }

    out
}

/// Sanitize a metric name. Colons are legal in metric names.
pub fn metric_name(raw: &str) -> String {
    clear_name(raw, true, Some(DEFAULT_PLACEHOLDER))
}

/// Sanitize a label name. Colons are reserved for recording rules and are
/// never legal in label names.
pub fn label_name(raw: &str) -> String {
    clear_name(raw, false, Some(DEFAULT_PLACEHOLDER))
}

/// Returns true if `name` is already a valid label name.
pub fn is_valid_label_name(name: &str) -> bool {
    !name.is_empty() && label_name(name) == name
}

//! Projection of raw upstream model records into canonical descriptors.
//!
//! Upstream JSON is only ever held as [`serde_json::Value`] inside the raw record
//! types; everything that leaves this module is fully populated and typed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::models::{ModelDescriptor, ModelDetails};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const UNKNOWN: &str = "Unknown";

/// One entry of the upstream `/api/tags` listing, fields untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawModelRecord {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub size: Option<Value>,
    #[serde(default)]
    pub modified_at: Option<Value>,
}

/// Upstream `/api/show` body, fields untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawModelDetails {
    #[serde(default)]
    pub modified_at: Option<Value>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Render a byte count with binary units, e.g. `1536` -> `"1.5 KB"`.
///
/// Missing or non-integer input yields `"Unknown"`.
pub fn format_size(raw: Option<&str>) -> String {
    let bytes = match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
        Some(bytes) => bytes,
        None => return UNKNOWN.to_string(),
    };

    let mut value = bytes as f64;
    let mut order = 0;
    while value >= 1024.0 && order < SIZE_UNITS.len() - 1 {
        order += 1;
        value /= 1024.0;
    }

    format!("{} {}", trim_fraction(value), SIZE_UNITS[order])
}

/// Two fractional digits at most, trailing zeros dropped.
fn trim_fraction(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Text form of a JSON scalar; `null` counts as absent.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Size field as text, whether the upstream sent a number or a string.
pub fn size_text(value: Option<&Value>) -> Option<String> {
    value.and_then(value_text)
}

/// Parse the timestamp formats Ollama and its predecessors emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` helper: unparsable timestamps become `None` instead of failing the body.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_text)
        .and_then(|s| parse_timestamp(&s)))
}

/// Resolve a modification time, falling back to now. The flag reports the fallback.
fn resolve_modified_at(raw: Option<&Value>, subject: &str) -> (DateTime<Utc>, bool) {
    match raw.and_then(value_text).as_deref().and_then(parse_timestamp) {
        Some(ts) => (ts, false),
        None => {
            warn!(
                "Model {} has missing or unparsable modified_at ({:?}); substituting current time",
                subject, raw
            );
            (Utc::now(), true)
        }
    }
}

pub fn normalize(record: &RawModelRecord) -> ModelDescriptor {
    let name = record
        .name
        .as_ref()
        .and_then(value_text)
        .unwrap_or_else(|| UNKNOWN.to_string());
    let size = format_size(size_text(record.size.as_ref()).as_deref());
    let (modified_at, modified_at_estimated) = resolve_modified_at(record.modified_at.as_ref(), &name);

    ModelDescriptor {
        name,
        size,
        modified_at,
        modified_at_estimated,
    }
}

/// Normalize a whole listing, ordered by name (ordinal, case-sensitive).
pub fn normalize_catalog(records: &[RawModelRecord]) -> Vec<ModelDescriptor> {
    let mut models: Vec<ModelDescriptor> = records.iter().map(normalize).collect();
    models.sort_by(|a, b| a.name.cmp(&b.name));
    models
}

pub fn normalize_details(model_name: &str, raw: &RawModelDetails) -> ModelDetails {
    let details = raw.details.as_ref();
    let field = |key: &str| details.and_then(|d| d.get(key)).and_then(value_text);

    let (modified_at, modified_at_estimated) = resolve_modified_at(raw.modified_at.as_ref(), model_name);

    ModelDetails {
        name: model_name.to_string(),
        size: format_size(field("size").as_deref()),
        format: field("format").unwrap_or_else(|| UNKNOWN.to_string()),
        family: field("family").unwrap_or_else(|| UNKNOWN.to_string()),
        parameters: extract_parameters(details.and_then(|d| d.get("parameters"))),
        modified_at,
        modified_at_estimated,
    }
}

/// `"key: value"` pairs of a parameters object; anything else yields nothing.
fn extract_parameters(parameters: Option<&Value>) -> Vec<String> {
    match parameters {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| {
                let value = value_text(value).unwrap_or_else(|| UNKNOWN.to_string());
                format!("{}: {}", key, value)
            })
            .collect(),
        _ => Vec::new(),
    }
}

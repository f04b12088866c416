//! Normalized search result records

use crate::search::fields;
use crate::store::RawHit;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A store document mapped onto the fields callers care about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultRecord {
    pub id: String,
    pub source_index: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// The untouched `_source` document
    pub raw_fields: Value,
}

impl SearchResultRecord {
    pub fn from_hit(hit: &RawHit) -> Self {
        let source = &hit.source;

        Self {
            id: hit.id.clone(),
            source_index: hit.index.clone(),
            timestamp: lookup(source, fields::TIMESTAMP).and_then(parse_timestamp),
            message: first_text(source, &fields::MESSAGE_PRECEDENCE).unwrap_or_default(),
            level: text_at(source, fields::LOG_LEVEL).or_else(|| text_at(source, "level")),
            service: text_at(source, fields::SERVICE).or_else(|| text_at(source, "service")),
            environment: first_text(source, &[fields::ENVIRONMENT, fields::SERVICE_ENVIRONMENT]),
            stack_trace: first_text(source, &fields::STACK_TRACE_PRECEDENCE),
            tags: lookup(source, fields::TAGS).and_then(string_list),
            raw_fields: source.clone(),
        }
    }

    /// Deduplication identity
    pub fn identity(&self) -> (&str, &str) {
        (&self.source_index, &self.id)
    }
}

/// Resolve a dotted path against nested objects or flattened dotted keys
pub fn lookup<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = source.get(path) {
        return Some(value);
    }
    let (head, rest) = path.split_once('.')?;
    lookup(source.get(head)?, rest)
}

/// Non-empty string at a dotted path
pub fn text_at(source: &Value, path: &str) -> Option<String> {
    lookup(source, path)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// First non-empty string among the paths, in order
pub fn first_text(source: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| text_at(source, path))
}

/// Accepts RFC 3339 strings and epoch milliseconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        Value::String(s) => Some(vec![s.clone()]),
        _ => None,
    }
}

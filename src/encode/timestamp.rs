//! Timestamp resolution with a multi-level pattern fallback chain

use super::LogicalRecord;
use crate::schema::{MetricMetadata, OrgMetadata, TimestampPattern, TIMESTAMP_FIELD};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime};

/// Resolves which input key holds the timestamp and parses it.
///
/// Parsing walks metric-level patterns first (declared order, first match
/// wins), then org-level patterns, then a raw epoch-millis fallback. Any
/// successful parse wins; only a record no configured pattern can read is
/// fatal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampResolver;

impl TimestampResolver {
    pub fn new() -> Self {
        Self
    }

    /// The record key carrying the timestamp: the first record key matching
    /// one of the metric's timestamp-field aliases, else the default
    /// reserved key.
    pub fn timestamp_key<'a>(&self, record: &'a LogicalRecord, metric: &MetricMetadata) -> &'a str {
        record
            .keys()
            .find(|key| metric.timestamp_aliases.iter().any(|a| a == key.as_str()))
            .map(|key| key.as_str())
            .unwrap_or(TIMESTAMP_FIELD)
    }

    /// Parse the resolved key's value into epoch millis.
    pub fn resolve(
        &self,
        record: &LogicalRecord,
        metric: &MetricMetadata,
        org: &OrgMetadata,
    ) -> Result<i64> {
        let key = self.timestamp_key(record, metric);
        let value = record.get(key).ok_or_else(|| {
            Error::MalformedRecord(format!("record has no timestamp under key '{}'", key))
        })?;

        if let Some(raw) = value.as_str() {
            for pattern in metric
                .timestamp_patterns
                .iter()
                .chain(org.timestamp_patterns.iter())
            {
                if let Some(millis) = parse_pattern(pattern, raw) {
                    return Ok(millis);
                }
            }
        }

        // Raw integer / epoch-millis fallback
        if let Some(millis) = value.as_i64() {
            return Ok(millis);
        }
        if let Some(raw) = value.as_str() {
            if let Ok(millis) = raw.trim().parse::<i64>() {
                return Ok(millis);
            }
        }

        Err(Error::MalformedRecord(format!(
            "timestamp under key '{}' not parsable by any configured pattern",
            key
        )))
    }
}

/// Strict parse of one pattern; chrono formats are non-lenient by default.
fn parse_pattern(pattern: &TimestampPattern, raw: &str) -> Option<i64> {
    match pattern {
        TimestampPattern::Iso8601 => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.timestamp_millis()),
        TimestampPattern::Iso8601Local => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|dt| dt.and_utc().timestamp_millis()),
        TimestampPattern::Rfc1123 => DateTime::parse_from_rfc2822(raw)
            .ok()
            .map(|dt| dt.timestamp_millis()),
        TimestampPattern::Custom(format) => {
            // Offset-aware first, then naive-as-UTC
            DateTime::parse_from_str(raw, format)
                .ok()
                .map(|dt| dt.timestamp_millis())
                .or_else(|| {
                    NaiveDateTime::parse_from_str(raw, format)
                        .ok()
                        .map(|dt| dt.and_utc().timestamp_millis())
                })
        }
    }
}

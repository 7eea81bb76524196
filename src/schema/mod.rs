//! Schema definitions for aliasforge
//!
//! Organizations own metrics, metrics own fields, and every one of them is
//! addressed by a stable canonical id that user-visible aliases map onto.
//! Snapshots are immutable: evolution always produces a new value with a
//! bumped version, committed through the store layer's CAS.

mod builder;
mod metric;
mod org;
mod types;

pub use builder::{
    BuildOutput, FieldChange, FieldDraft, MetricDraft, MetricUpdate, OrgChange, SchemaBuilder,
};
pub use metric::MetricMetadata;
pub use org::OrgMetadata;
pub use types::{value_to_string, FieldType, FieldValue};

use serde::{Deserialize, Serialize};

/// Physical base-field member names. Every metric's physical schema carries
/// this block; it is never user-deletable and user names must not collide
/// with it.
pub const BASE_TIMESTAMP: &str = "timestamp";
pub const BASE_WRITE_TIME: &str = "writeTime";
pub const BASE_ALIAS_NAME: &str = "aliasName";
pub const BASE_UNKNOWN_FIELDS: &str = "unknownFields";

/// Reserved logical record keys: these route a record to its org, metric,
/// and timestamp instead of going through alias resolution.
pub const ORG_KEY_FIELD: &str = "companykey";
pub const METRIC_TYPE_FIELD: &str = "metrictype";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// A timestamp-parsing pattern, tried in declared order.
///
/// Well-known formats are named; user patterns are chrono format strings
/// resolved strictly (no lenient fixups).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampPattern {
    /// ISO-8601 / RFC-3339 with offset, e.g. `2024-05-01T12:00:00+02:00`
    Iso8601,
    /// ISO-8601 local date-time without offset, interpreted as UTC
    Iso8601Local,
    /// RFC-1123 / RFC-2822, e.g. `Wed, 01 May 2024 12:00:00 GMT`
    Rfc1123,
    /// User-supplied chrono format string
    Custom(String),
}

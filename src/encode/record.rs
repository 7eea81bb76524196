//! Logical and physical record shapes

use crate::schema::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ephemeral caller-supplied record: field key -> JSON value. Created per
/// call and discarded after encoding.
pub type LogicalRecord = BTreeMap<String, serde_json::Value>;

/// The fixed base sub-record every physical record carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFields {
    /// Event time in epoch millis, resolved through the pattern chain
    pub timestamp: i64,
    /// Encode time in epoch millis, from the injectable clock
    pub write_time: i64,
    /// The metric alias that routed this record
    pub alias_name: String,
    /// Input keys that resolved to no canonical field, values stringified
    pub unknown_fields: BTreeMap<String, String>,
}

/// One populated field slot: the alias the caller used plus the coerced
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSlot {
    pub display_name: String,
    pub value: FieldValue,
}

/// A record encoded against one metric's physical schema: the base
/// sub-record plus one nullable slot per known canonical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedRecord {
    pub org_id: String,
    pub metric_canonical_id: String,
    pub base: BaseFields,
    /// Canonical field id -> slot; None when the input had no value for it
    pub fields: BTreeMap<String, Option<FieldSlot>>,
}

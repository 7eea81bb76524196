//! Metric metadata snapshot

use super::{FieldType, TimestampPattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable snapshot of one metric's field registry and physical schema.
///
/// `field_registry` maps canonical field ids to ordered alias lists
/// (`aliases[0]` is the display name, disjoint within the metric). A
/// hard-deleted field keeps its key with an empty alias list so the
/// canonical id is never reused. `physical_schema` holds the declared type
/// of every encodable custom field; the reserved base block (timestamp,
/// writeTime, aliasName, unknownFields) is structural and always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMetadata {
    /// Owning tenant
    pub org_id: String,
    /// Canonical metric id, immutable once minted
    pub canonical_id: String,
    /// Committed version, bumped by exactly 1 per update
    pub version: u64,
    /// Canonical field id -> ordered alias list (empty = hard-delete tombstone)
    pub field_registry: BTreeMap<String, Vec<String>>,
    /// Soft-deleted fields: canonical field id -> hide timestamp (millis).
    /// Hidden fields stay fully encodable.
    pub hidden_fields: BTreeMap<String, i64>,
    /// Canonical field id -> declared type for every encodable custom field
    pub physical_schema: BTreeMap<String, FieldType>,
    /// Metric-level timestamp patterns, tried before org-level ones
    pub timestamp_patterns: Vec<TimestampPattern>,
    /// Field aliases that may carry the record timestamp
    pub timestamp_aliases: Vec<String>,
}

impl MetricMetadata {
    pub fn new(org_id: impl Into<String>, canonical_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            canonical_id: canonical_id.into(),
            version: 0,
            field_registry: BTreeMap::new(),
            hidden_fields: BTreeMap::new(),
            physical_schema: BTreeMap::new(),
            timestamp_patterns: Vec::new(),
            timestamp_aliases: Vec::new(),
        }
    }

    /// Resolve a field alias to its canonical id.
    pub fn resolve_field(&self, alias: &str) -> Option<&str> {
        self.field_registry
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a == alias))
            .map(|(canonical, _)| canonical.as_str())
    }

    /// Alias list for a canonical field id.
    pub fn field_aliases(&self, canonical: &str) -> Option<&[String]> {
        self.field_registry.get(canonical).map(|v| v.as_slice())
    }

    /// Display name (alias[0]) for a canonical field id.
    pub fn field_display_name(&self, canonical: &str) -> Option<&str> {
        self.field_registry
            .get(canonical)
            .and_then(|aliases| aliases.first())
            .map(|s| s.as_str())
    }

    /// Declared type of an encodable field, if it is still in the physical
    /// schema.
    pub fn declared_type(&self, canonical: &str) -> Option<FieldType> {
        self.physical_schema.get(canonical).copied()
    }

    /// Whether a field has been soft-deleted (hidden but still encodable).
    pub fn is_hidden(&self, canonical: &str) -> bool {
        self.hidden_fields.contains_key(canonical)
    }

    /// Whether an alias is already claimed by any field of this metric.
    /// Field aliases are disjoint within one metric.
    pub fn alias_in_use(&self, alias: &str) -> bool {
        self.resolve_field(alias).is_some()
    }

    /// Canonical ids of live (non-tombstoned) fields.
    pub fn live_fields(&self) -> impl Iterator<Item = &str> {
        self.field_registry
            .iter()
            .filter(|(_, aliases)| !aliases.is_empty())
            .map(|(canonical, _)| canonical.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric_with_field(aliases: &[&str], ty: FieldType) -> MetricMetadata {
        let mut metric = MetricMetadata::new("acme", "_m1");
        metric.field_registry.insert(
            "_f1ab2cd34".to_string(),
            aliases.iter().map(|a| a.to_string()).collect(),
        );
        metric
            .physical_schema
            .insert("_f1ab2cd34".to_string(), ty);
        metric
    }

    #[test]
    fn test_resolve_field_alias() {
        let metric = metric_with_field(&["url", "u"], FieldType::String);
        assert_eq!(metric.resolve_field("url"), Some("_f1ab2cd34"));
        assert_eq!(metric.resolve_field("u"), Some("_f1ab2cd34"));
        assert_eq!(metric.resolve_field("path"), None);
    }

    #[test]
    fn test_declared_type_lookup() {
        let metric = metric_with_field(&["url"], FieldType::String);
        assert_eq!(metric.declared_type("_f1ab2cd34"), Some(FieldType::String));
        assert_eq!(metric.declared_type("_f99999999"), None);
    }

    #[test]
    fn test_hard_delete_tombstone_does_not_resolve() {
        let mut metric = metric_with_field(&["url"], FieldType::String);
        metric.field_registry.insert("_f1ab2cd34".to_string(), vec![]);
        metric.physical_schema.remove("_f1ab2cd34");
        assert_eq!(metric.resolve_field("url"), None);
        assert!(metric.live_fields().next().is_none());
    }
}

//! Organization metadata snapshot

use super::TimestampPattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable snapshot of one tenant's metric registry.
///
/// `metric_registry` maps canonical metric ids to their ordered alias list;
/// `aliases[0]` is the display name. A deleted metric keeps its key with an
/// empty alias list: the tombstone guarantees the canonical id is never
/// reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgMetadata {
    /// Canonical tenant id, immutable
    pub org_id: String,
    /// Committed version, bumped by exactly 1 per update
    pub version: u64,
    /// Canonical metric id -> ordered alias list (empty = tombstone)
    pub metric_registry: BTreeMap<String, Vec<String>>,
    /// Org-wide timestamp patterns, tried after metric-level patterns
    pub timestamp_patterns: Vec<TimestampPattern>,
    /// Record keys that may carry the metric alias, checked in declared order
    pub metric_key_fields: Vec<String>,
}

impl OrgMetadata {
    pub fn new(org_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            version: 0,
            metric_registry: BTreeMap::new(),
            timestamp_patterns: Vec::new(),
            metric_key_fields: Vec::new(),
        }
    }

    /// Resolve a metric alias to its canonical id. Linear scan; registries
    /// are small and alias lists are the authoritative order.
    pub fn resolve_metric(&self, alias: &str) -> Option<&str> {
        self.metric_registry
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a == alias))
            .map(|(canonical, _)| canonical.as_str())
    }

    /// Alias list for a canonical metric id.
    pub fn metric_aliases(&self, canonical: &str) -> Option<&[String]> {
        self.metric_registry.get(canonical).map(|v| v.as_slice())
    }

    /// Display name (alias[0]) for a canonical metric id.
    pub fn metric_display_name(&self, canonical: &str) -> Option<&str> {
        self.metric_registry
            .get(canonical)
            .and_then(|aliases| aliases.first())
            .map(|s| s.as_str())
    }

    /// Whether the canonical id exists only as a tombstone.
    pub fn is_tombstoned(&self, canonical: &str) -> bool {
        self.metric_registry
            .get(canonical)
            .is_some_and(|aliases| aliases.is_empty())
    }

    /// Canonical ids of live (non-tombstoned) metrics.
    pub fn live_metrics(&self) -> impl Iterator<Item = &str> {
        self.metric_registry
            .iter()
            .filter(|(_, aliases)| !aliases.is_empty())
            .map(|(canonical, _)| canonical.as_str())
    }

    /// Whether an alias is already claimed by any metric in the registry.
    /// Metric aliases are disjoint org-wide.
    pub fn alias_in_use(&self, alias: &str) -> bool {
        self.resolve_metric(alias).is_some()
    }
}

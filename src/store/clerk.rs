//! Read-only query facade over one committed organization

use super::SchemaStore;
use crate::schema::{FieldType, MetricMetadata, OrgMetadata, TimestampPattern};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// One metric as presented to users: display name plus the full alias list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricListing {
    pub canonical_id: String,
    pub display_name: String,
    pub aliases: Vec<String>,
}

/// One field as presented to users.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldListing {
    pub canonical_id: String,
    pub display_name: String,
    pub aliases: Vec<String>,
    pub field_type: FieldType,
    /// Soft-delete timestamp (millis) if the field is hidden
    pub hidden_at: Option<i64>,
}

/// Read-only facade presenting stored definitions by user-visible name.
///
/// Parses the stored metadata once at construction and serves every query
/// from the cached snapshot; never mutates storage. Rebuild a clerk to see
/// later commits.
pub struct StoreClerk {
    org: OrgMetadata,
    metrics: BTreeMap<String, MetricMetadata>,
}

impl StoreClerk {
    /// Load the latest committed snapshot of an org.
    pub async fn load(store: &SchemaStore, org_id: &str) -> Result<Self> {
        let org = store.get_org_metadata(org_id).await?;
        let metrics = store.load_live_metrics(&org).await?;
        Ok(Self::from_snapshot(org, metrics))
    }

    /// Build directly from an already-loaded snapshot.
    pub fn from_snapshot(org: OrgMetadata, metrics: BTreeMap<String, MetricMetadata>) -> Self {
        Self { org, metrics }
    }

    pub fn org(&self) -> &OrgMetadata {
        &self.org
    }

    /// Live metrics with their display names and aliases.
    pub fn list_metrics(&self) -> Vec<MetricListing> {
        self.org
            .live_metrics()
            .filter_map(|canonical| {
                let aliases = self.org.metric_aliases(canonical)?;
                Some(MetricListing {
                    canonical_id: canonical.to_string(),
                    display_name: aliases.first()?.clone(),
                    aliases: aliases.to_vec(),
                })
            })
            .collect()
    }

    /// Live fields of one metric (addressed by alias), hidden ones flagged.
    pub fn list_fields(&self, metric_alias: &str) -> Result<Vec<FieldListing>> {
        let metric = self.metric(metric_alias)?;
        let listings = metric
            .live_fields()
            .filter_map(|canonical| {
                let aliases = metric.field_aliases(canonical)?;
                Some(FieldListing {
                    canonical_id: canonical.to_string(),
                    display_name: aliases.first()?.clone(),
                    aliases: aliases.to_vec(),
                    field_type: metric.declared_type(canonical)?,
                    hidden_at: metric.hidden_fields.get(canonical).copied(),
                })
            })
            .collect();
        Ok(listings)
    }

    /// Resolve a metric alias to its canonical id.
    pub fn resolve_metric(&self, alias: &str) -> Result<&str> {
        self.org
            .resolve_metric(alias)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "metric alias '{}' in org '{}'",
                    alias, self.org.org_id
                ))
            })
    }

    /// Alias list for a canonical metric id.
    pub fn metric_aliases(&self, canonical: &str) -> Result<&[String]> {
        self.org
            .metric_aliases(canonical)
            .ok_or_else(|| Error::NotFound(format!("canonical metric id '{}'", canonical)))
    }

    /// Cached metric metadata by alias.
    pub fn metric(&self, alias: &str) -> Result<&MetricMetadata> {
        let canonical = self.resolve_metric(alias)?;
        self.metrics
            .get(canonical)
            .ok_or_else(|| Error::NotFound(format!("metric metadata for canonical id '{}'", canonical)))
    }

    /// Cached metric metadata by canonical id.
    pub fn metric_by_canonical(&self, canonical: &str) -> Result<&MetricMetadata> {
        self.metrics
            .get(canonical)
            .ok_or_else(|| Error::NotFound(format!("metric metadata for canonical id '{}'", canonical)))
    }

    /// Record keys that may carry the metric alias, in declared order.
    pub fn metric_key_fields(&self) -> &[String] {
        &self.org.metric_key_fields
    }

    /// Org-wide timestamp patterns.
    pub fn timestamp_patterns(&self) -> &[TimestampPattern] {
        &self.org.timestamp_patterns
    }
}

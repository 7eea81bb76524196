//! Fluent, alias-keyed schema management API

use super::SchemaStore;
use crate::clock::{Clock, SystemClock};
use crate::naming::StopWordValidator;
use crate::repository::Repository;
use crate::schema::{
    FieldDraft, MetricDraft, MetricMetadata, OrgChange, OrgMetadata, SchemaBuilder,
    TimestampPattern,
};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// User-facing management API.
///
/// Everything is keyed by user-visible alias; canonical resolution happens
/// internally at commit and failed resolution surfaces as NotFound, never a
/// guess. A draft accumulates changes and `commit` performs exactly one
/// store write (subject to the store's non-atomic metric batch).
pub struct StoreManager {
    store: SchemaStore,
    builder: SchemaBuilder,
    clock: Arc<dyn Clock>,
}

impl StoreManager {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            store: SchemaStore::new(repo),
            builder: SchemaBuilder::new(),
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Construct with a custom validator and clock (tests pin both).
    pub fn with_parts(
        repo: Arc<dyn Repository>,
        validator: StopWordValidator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store: SchemaStore::new(repo),
            builder: SchemaBuilder::with_validator(validator),
            clock,
        }
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    /// Open a draft for a brand-new organization.
    pub fn create_org(&self, org_id: impl Into<String>) -> OrgDraft {
        OrgDraft {
            org_id: org_id.into(),
            base: None,
            changes: Vec::new(),
        }
    }

    /// Open a draft against the latest committed snapshot of an org.
    pub async fn update_org(&self, org_id: &str) -> Result<OrgDraft> {
        let org = self.store.get_org_metadata(org_id).await?;
        let metrics = self.store.load_live_metrics(&org).await?;
        Ok(OrgDraft {
            org_id: org_id.to_string(),
            base: Some((org, metrics)),
            changes: Vec::new(),
        })
    }

    /// Validate, assemble, and commit a draft in one store write.
    pub async fn commit(&self, draft: OrgDraft) -> Result<OrgMetadata> {
        let now = self.clock.now_millis();
        match draft.base {
            None => {
                let out = self
                    .builder
                    .build_new_org(&draft.org_id, draft.changes, now)?;
                self.store.create_new_organization(&out).await?;
                Ok(out.org)
            }
            Some((org, metrics)) => {
                let out = self.builder.build_update(&org, &metrics, draft.changes, now)?;
                self.store.update_org(&out, &org).await?;
                Ok(out.org)
            }
        }
    }

    /// Bounded re-read-and-retry commit for callers racing other writers.
    ///
    /// Staleness is signalled by the store, never self-retried there; this
    /// helper is the explicit caller-side loop: re-read the latest
    /// snapshot, re-apply the same changes, try again with backoff.
    pub async fn commit_with_retry(
        &self,
        org_id: &str,
        changes: Vec<OrgChange>,
        max_attempts: u32,
    ) -> Result<OrgMetadata> {
        for attempt in 0..max_attempts {
            let mut draft = self.update_org(org_id).await?;
            draft.changes = changes.clone();

            match self.commit(draft).await {
                Ok(org) => return Ok(org),
                Err(Error::StaleWrite { subject, .. }) => {
                    warn!(org_id, subject, attempt, "stale commit, re-reading");
                    tokio::time::sleep(std::time::Duration::from_millis(retry_backoff_ms(
                        attempt,
                    )))
                    .await;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::TooManyRetries)
    }
}

/// Doubling backoff with the exponent capped so arbitrarily large attempt
/// counts cannot overflow.
fn retry_backoff_ms(attempt: u32) -> u64 {
    const MAX_EXPONENT: u32 = 10;
    10 * 2u64.pow(attempt.min(MAX_EXPONENT))
}

/// Pending changes against one organization.
///
/// Holds the snapshot it was opened on (None for the create path) plus the
/// accumulated change list; nothing is validated until commit.
pub struct OrgDraft {
    org_id: String,
    base: Option<(OrgMetadata, BTreeMap<String, MetricMetadata>)>,
    changes: Vec<OrgChange>,
}

impl OrgDraft {
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// Snapshot the draft was opened on, if updating.
    pub fn current(&self) -> Option<&OrgMetadata> {
        self.base.as_ref().map(|(org, _)| org)
    }

    /// Create a new metric from a draft.
    pub fn metric(mut self, draft: MetricDraft) -> Self {
        self.changes.push(OrgChange::CreateMetric(draft));
        self
    }

    /// Apply a metric draft to the metric currently known by `alias`.
    pub fn update_metric(mut self, alias: impl Into<String>, draft: MetricDraft) -> Self {
        self.changes.push(OrgChange::UpdateMetric {
            alias: alias.into(),
            draft,
        });
        self
    }

    /// Tombstone the metric known by `alias`.
    pub fn delete_metric(mut self, alias: impl Into<String>) -> Self {
        self.changes.push(OrgChange::DeleteMetric {
            alias: alias.into(),
        });
        self
    }

    /// Append a second alias to a metric.
    pub fn add_metric_alias(self, metric: impl Into<String>, alias: impl Into<String>) -> Self {
        self.update_metric(metric, MetricDraft::update().alias(alias))
    }

    /// Replace a metric's display name, demoting the old one.
    pub fn rename_metric(self, metric: impl Into<String>, name: impl Into<String>) -> Self {
        self.update_metric(metric, MetricDraft::update().display_name(name))
    }

    /// Add a typed field to a metric.
    pub fn add_field(self, metric: impl Into<String>, field: FieldDraft) -> Self {
        self.update_metric(metric, MetricDraft::update().field(field))
    }

    /// Append an alias to a field.
    pub fn add_field_alias(
        self,
        metric: impl Into<String>,
        field: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        self.update_metric(metric, MetricDraft::update().field_alias(field, alias))
    }

    /// Replace a field's display name, demoting the old one.
    pub fn rename_field(
        self,
        metric: impl Into<String>,
        field: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.update_metric(metric, MetricDraft::update().rename_field(field, name))
    }

    /// Hide a field; it stays encodable.
    pub fn soft_delete_field(self, metric: impl Into<String>, field: impl Into<String>) -> Self {
        self.update_metric(metric, MetricDraft::update().soft_delete(field))
    }

    /// Remove a field from the physical schema irreversibly.
    pub fn hard_delete_field(self, metric: impl Into<String>, field: impl Into<String>) -> Self {
        self.update_metric(metric, MetricDraft::update().hard_delete(field))
    }

    /// Replace the org-wide timestamp patterns.
    pub fn timestamp_patterns(mut self, patterns: Vec<TimestampPattern>) -> Self {
        self.changes.push(OrgChange::SetTimestampPatterns(patterns));
        self
    }

    /// Replace the record keys that may carry the metric alias.
    pub fn metric_key_fields(mut self, fields: Vec<String>) -> Self {
        debug!(org_id = %self.org_id, ?fields, "setting metric key candidates");
        self.changes.push(OrgChange::SetMetricKeyFields(fields));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_backoff_doubles_then_caps() {
        assert_eq!(retry_backoff_ms(0), 10);
        assert_eq!(retry_backoff_ms(3), 80);
        // Large attempt counts hold at the cap instead of overflowing
        assert_eq!(retry_backoff_ms(64), retry_backoff_ms(10));
        assert_eq!(retry_backoff_ms(u32::MAX), retry_backoff_ms(10));
    }
}

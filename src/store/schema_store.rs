//! Repository orchestration with optimistic concurrency

use crate::repository::{Repository, VersionedSchema};
use crate::schema::{BuildOutput, MetricMetadata, OrgMetadata};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates reads and writes of builder output against the abstract
/// repository. Every write is a CAS keyed on the snapshot it was built
/// from; staleness is signalled, never self-retried (except the narrow
/// identical-value path below).
pub struct SchemaStore {
    repo: Arc<dyn Repository>,
}

impl SchemaStore {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Subject key for one metric's schema.
    pub fn metric_subject(org_id: &str, canonical_id: &str) -> String {
        format!("{}.{}", org_id, canonical_id)
    }

    /// Register a brand-new organization.
    ///
    /// Fails with AlreadyExists if the tenant key is present; otherwise
    /// writes org metadata at version 0 and each created metric under
    /// `{org_id}.{canonical_metric_id}`.
    pub async fn create_new_organization(&self, out: &BuildOutput) -> Result<()> {
        let org_id = out.org.org_id.as_str();
        if self.repo.lookup(org_id).await? {
            return Err(Error::AlreadyExists(format!("organization '{}'", org_id)));
        }

        self.repo.register(org_id).await?;
        let payload = serde_json::to_string(&out.org)?;
        // A rival creator may land between the lookup and this write; the
        // contract for a duplicate org is AlreadyExists either way
        match self.repo.put_if_latest(org_id, &payload, None).await {
            Ok(_) => {}
            Err(Error::StaleWrite { .. }) => {
                return Err(Error::AlreadyExists(format!("organization '{}'", org_id)));
            }
            Err(e) => return Err(e),
        }

        for metric in &out.created {
            let subject = Self::metric_subject(org_id, &metric.canonical_id);
            self.repo.register(&subject).await?;
            let payload = serde_json::to_string(metric)?;
            self.repo.put_if_latest(&subject, &payload, None).await?;
        }

        info!(
            org_id,
            metrics = out.created.len(),
            "registered new organization"
        );
        Ok(())
    }

    /// CAS write of one metric's next snapshot.
    ///
    /// `previous == None` means the metric subject must be unregistered
    /// (creation inside an org update). On a rejected creation, if the
    /// stored latest is byte-identical to what we tried to write the
    /// rejection was only a re-registration of the same value and is
    /// treated as success; every other mismatch propagates as StaleWrite
    /// with no partial effect.
    pub async fn update_org_metric(
        &self,
        org: &OrgMetadata,
        next: &MetricMetadata,
        previous: Option<&MetricMetadata>,
    ) -> Result<VersionedSchema> {
        let subject = Self::metric_subject(&org.org_id, &next.canonical_id);
        self.repo.register(&subject).await?;

        let payload = serde_json::to_string(next)?;
        let expected = previous.map(|p| p.version);

        match self.repo.put_if_latest(&subject, &payload, expected).await {
            Ok(committed) => {
                debug!(
                    subject,
                    version = committed.version,
                    "committed metric schema"
                );
                Ok(committed)
            }
            Err(Error::StaleWrite {
                subject: stale_subject,
                stored,
                expected,
            }) => {
                if previous.is_none() {
                    if let Some(latest) = self.repo.latest(&subject).await? {
                        if latest.schema == payload {
                            debug!(subject, "identical value already registered");
                            return Ok(latest);
                        }
                    }
                }
                Err(Error::StaleWrite {
                    subject: stale_subject,
                    stored,
                    expected,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Commit a full org update: org metadata first, then each metric.
    ///
    /// Org metadata is always rewritten, which is simpler than detecting
    /// whether membership changed. NOT atomic across metrics: a later CAS
    /// failure does not roll back earlier successful metric writes in the
    /// same batch.
    pub async fn update_org(&self, out: &BuildOutput, previous_org: &OrgMetadata) -> Result<()> {
        let org_id = out.org.org_id.as_str();
        if !self.repo.lookup(org_id).await? {
            return Err(Error::NotFound(format!("organization '{}'", org_id)));
        }

        let payload = serde_json::to_string(&out.org)?;
        self.repo
            .put_if_latest(org_id, &payload, Some(previous_org.version))
            .await?;

        for metric in &out.created {
            self.update_org_metric(&out.org, metric, None).await?;
        }
        for update in &out.updated {
            self.update_org_metric(&out.org, &update.next, Some(&update.previous))
                .await?;
        }

        info!(
            org_id,
            version = out.org.version,
            created = out.created.len(),
            updated = out.updated.len(),
            "committed organization update"
        );
        Ok(())
    }

    /// Latest committed org metadata.
    pub async fn get_org_metadata(&self, org_id: &str) -> Result<OrgMetadata> {
        let latest = self
            .repo
            .latest(org_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("organization '{}'", org_id)))?;
        Ok(serde_json::from_str(&latest.schema)?)
    }

    /// Latest committed metric metadata by canonical id.
    pub async fn get_metric_metadata(
        &self,
        org_id: &str,
        canonical_id: &str,
    ) -> Result<MetricMetadata> {
        let subject = Self::metric_subject(org_id, canonical_id);
        let latest = self
            .repo
            .latest(&subject)
            .await?
            .ok_or_else(|| Error::NotFound(format!("metric subject '{}'", subject)))?;
        Ok(serde_json::from_str(&latest.schema)?)
    }

    /// Latest committed metric metadata by user-visible alias. Alias
    /// resolution is a linear scan of the org's alias registry.
    pub async fn get_metric_from_alias(
        &self,
        org_id: &str,
        alias: &str,
    ) -> Result<MetricMetadata> {
        let org = self.get_org_metadata(org_id).await?;
        let canonical = org
            .resolve_metric(alias)
            .ok_or_else(|| Error::NotFound(format!("metric alias '{}' in org '{}'", alias, org_id)))?;
        self.get_metric_metadata(org_id, canonical).await
    }

    /// Load every live metric of an org, keyed by canonical id.
    pub async fn load_live_metrics(
        &self,
        org: &OrgMetadata,
    ) -> Result<BTreeMap<String, MetricMetadata>> {
        let mut metrics = BTreeMap::new();
        for canonical in org.live_metrics() {
            let metric = self.get_metric_metadata(&org.org_id, canonical).await?;
            metrics.insert(canonical.to_string(), metric);
        }
        Ok(metrics)
    }
}

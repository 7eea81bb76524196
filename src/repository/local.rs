//! Local in-memory repository for development and testing

use super::{Repository, VersionedSchema};
use crate::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory repository.
///
/// Stores the full version history per subject. CAS atomicity comes from
/// the dashmap entry lock: the expected-version check and the append happen
/// under one shard guard.
#[derive(Debug, Default)]
pub struct LocalRepository {
    /// Subject -> committed versions, oldest first
    subjects: DashMap<String, Vec<VersionedSchema>>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self {
            subjects: DashMap::new(),
        }
    }

    /// Number of committed versions for a subject (test/diagnostic helper).
    pub fn version_count(&self, subject: &str) -> usize {
        self.subjects.get(subject).map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Repository for LocalRepository {
    async fn register(&self, subject: &str) -> Result<()> {
        self.subjects.entry(subject.to_string()).or_default();
        Ok(())
    }

    async fn lookup(&self, subject: &str) -> Result<bool> {
        Ok(self.subjects.contains_key(subject))
    }

    async fn latest(&self, subject: &str) -> Result<Option<VersionedSchema>> {
        Ok(self
            .subjects
            .get(subject)
            .and_then(|versions| versions.last().cloned()))
    }

    async fn put_if_latest(
        &self,
        subject: &str,
        schema: &str,
        expected_version: Option<u64>,
    ) -> Result<VersionedSchema> {
        let mut entry = self.subjects.entry(subject.to_string()).or_default();
        let stored = entry.last().map(|v| v.version);

        if stored != expected_version {
            return Err(Error::StaleWrite {
                subject: subject.to_string(),
                stored,
                expected: expected_version,
            });
        }

        let next = VersionedSchema {
            version: expected_version.map(|v| v + 1).unwrap_or(0),
            schema: schema.to_string(),
        };
        entry.push(next.clone());
        Ok(next)
    }
}

//! Abstract versioned schema repository
//!
//! The registry delegates all cross-writer coordination to this contract's
//! CAS primitive: a write commits only if nothing else committed to the
//! subject since the caller's last read. Backends beyond the in-memory one
//! (and any caching in front of them) live outside this crate.

mod local;

pub use local::LocalRepository;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One committed version of a subject's serialized schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedSchema {
    /// Monotonic per-subject version id, starting at 0
    pub version: u64,
    /// Serialized schema payload
    pub schema: String,
}

/// Versioned key-value store interface.
///
/// Every call is a potential blocking I/O point. Implementations must make
/// `put_if_latest` atomic per subject: no partial writes, no silent
/// overwrite.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Idempotent create of a named subject.
    async fn register(&self, subject: &str) -> Result<()>;

    /// Whether the subject exists (registered, possibly without versions).
    async fn lookup(&self, subject: &str) -> Result<bool>;

    /// Latest committed version for a subject, if any.
    async fn latest(&self, subject: &str) -> Result<Option<VersionedSchema>>;

    /// Compare-and-swap write.
    ///
    /// `expected_version == None` requires the subject to have no committed
    /// version yet (the new version is 0); `Some(v)` requires the stored
    /// latest to be exactly `v` (the new version is `v + 1`). A mismatch
    /// fails with [`crate::Error::StaleWrite`] naming both sides; the
    /// caller re-reads and retries.
    async fn put_if_latest(
        &self,
        subject: &str,
        schema: &str,
        expected_version: Option<u64>,
    ) -> Result<VersionedSchema>;
}

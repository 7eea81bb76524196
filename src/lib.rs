//! # aliasforge
//!
//! A multi-tenant schema registry and record-encoding bridge.
//!
//! Each tenant ("organization") defines metrics with evolvable sets of
//! named fields. Display names and aliases change freely over time while
//! every metric and field keeps a stable canonical identity, so
//! previously-encoded data and downstream consumers never break when a
//! user renames something.
//!
//! ## Architecture
//!
//! - **SchemaBuilder**: pure construction of org/metric snapshots; owns
//!   naming and alias-uniqueness invariants
//! - **SchemaStore**: commits builder output to the abstract repository
//!   with optimistic concurrency (register-if-still-latest)
//! - **StoreManager / StoreClerk**: fluent alias-keyed write API and the
//!   read-only query facade
//! - **RecordEncoder**: bidirectional mapping between logical records and
//!   a metric's typed physical schema, with unknown-field capture and
//!   multi-level timestamp resolution
//!
//! Snapshots are immutable: every mutation produces a new value with a
//! bumped version, and a write commits only if nothing else committed to
//! that subject since the writer's last read.

pub mod clock;
pub mod config;
pub mod encode;
pub mod naming;
pub mod repository;
pub mod schema;
pub mod store;

mod error;

pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::encode::{EncodedRecord, LogicalRecord, RecordEncoder, TimestampResolver};
    pub use crate::naming::{NameGenerator, StopWordValidator};
    pub use crate::repository::{LocalRepository, Repository, VersionedSchema};
    pub use crate::schema::{
        FieldDraft, FieldType, FieldValue, MetricDraft, MetricMetadata, OrgChange, OrgMetadata,
        SchemaBuilder, TimestampPattern,
    };
    pub use crate::store::{SchemaStore, StoreClerk, StoreManager};
    pub use crate::{Error, Result};
}

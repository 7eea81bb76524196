//! Storage orchestration for schema snapshots
//!
//! [`SchemaStore`] moves builder output in and out of the abstract
//! repository with optimistic concurrency; [`StoreManager`] is the fluent,
//! alias-keyed write API on top of it; [`StoreClerk`] is the read-only
//! query facade.

mod clerk;
mod manager;
mod schema_store;

pub use clerk::{FieldListing, MetricListing, StoreClerk};
pub use manager::StoreManager;
pub use schema_store::SchemaStore;

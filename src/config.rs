//! Component factory for environment-based configuration
//!
//! Chooses the repository backend from environment variables so tests and
//! development default to the in-memory implementation while deployments
//! plug in an external versioned store.

use crate::repository::{LocalRepository, Repository};
use crate::Result;
use std::sync::Arc;
use tracing::info;

pub struct ComponentFactory;

impl ComponentFactory {
    /// Create a repository from environment
    ///
    /// Environment variables:
    /// - REGISTRY_BACKEND: "memory" (default)
    ///
    /// External backends implement the [`Repository`] trait and are wired
    /// in by the embedding service; this factory only knows the built-in
    /// one.
    pub fn create_repository() -> Result<Arc<dyn Repository>> {
        let backend = std::env::var("REGISTRY_BACKEND").unwrap_or_else(|_| "memory".to_string());

        match backend.as_str() {
            "memory" => {
                info!("Using in-memory repository (development mode)");
                Ok(Arc::new(LocalRepository::new()))
            }
            _ => Err(crate::Error::Config(format!(
                "Unknown REGISTRY_BACKEND: {}. Use 'memory' or wire an external Repository",
                backend
            ))),
        }
    }
}

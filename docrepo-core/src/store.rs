//! Document store: the entry point that owns a backend and hands out repositories.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let settings = RepositorySettings::from_file("repositories.yaml")?;
//!
//! let users = store.repository_from_settings::<User>(&settings)?;
//! let orders = store.repository::<Order>(RepositoryConfig::new("orders", "shop"))?;
//! ```

use crate::{
    backend::StoreBackend,
    config::{RepositoryConfig, RepositorySettings},
    document::Entity,
    error::RepositoryResult,
    repository::GenericRepository,
};

/// A document store bound to a specific backend implementation.
///
/// Repositories receive a clone of the backend. Backends are expected to be
/// cheap to clone handles over shared state (a driver client, an `Arc`).
#[derive(Debug, Clone)]
pub struct DocumentStore<B: StoreBackend + Clone> {
    backend: B,
}

impl<B: StoreBackend + Clone> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates a repository for `T` bound to an explicit collection.
    ///
    /// # Errors
    ///
    /// Returns an error if either name in `config` is blank.
    pub fn repository<T: Entity>(&self, config: RepositoryConfig) -> RepositoryResult<GenericRepository<T, B>> {
        GenericRepository::new(self.backend.clone(), config)
    }

    /// Creates a repository for `T` with the binding configured under `T::entity_name()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings lack the collection or database name.
    pub fn repository_from_settings<T: Entity>(
        &self,
        settings: &RepositorySettings,
    ) -> RepositoryResult<GenericRepository<T, B>> {
        GenericRepository::from_settings(self.backend.clone(), settings)
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// Repositories created earlier keep their own handle; shutting down the
    /// store should be the last thing an application does.
    pub async fn shutdown(self) -> RepositoryResult<()> {
        self.backend.shutdown().await
    }
}

//! Storage backend abstraction for repositories.
//!
//! The [`StoreBackend`] trait is the seam between the generic repository and a
//! concrete document store. Each method is a single request against the
//! collection named by a [`RepositoryConfig`] binding; backends translate or
//! evaluate the [`Filter`] through a [`FilterVisitor`](crate::query::FilterVisitor).
//!
//! Implementations must be thread-safe (`Send + Sync`). The trait is object
//! safe, so `Arc<dyn StoreBackend>` can be used where the backend is only
//! known at runtime.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{backend::StoreBackend, config::RepositoryConfig, query::Filter};
//! use bson::doc;
//!
//! let binding = RepositoryConfig::new("users", "app");
//! backend.insert_one(&binding, doc! { "_id": "a1", "name": "Alice" }).await?;
//! let found = backend.find(&binding, &Filter::field("name", "Alice"), Some(1)).await?;
//! ```

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::{config::RepositoryConfig, error::RepositoryResult, query::Filter};

/// Match counts reported by a replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Number of documents that matched the filter.
    pub matched: u64,
    /// Number of documents whose content changed.
    pub modified: u64,
}

/// Abstract interface for document storage backends.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts one document, returning its `_id`.
    ///
    /// A backend assigns an `_id` when the document has none, and fails with
    /// [`RepositoryError::DuplicateKey`](crate::error::RepositoryError::DuplicateKey)
    /// when the `_id` is already taken.
    async fn insert_one(&self, binding: &RepositoryConfig, document: Document) -> RepositoryResult<Bson>;

    /// Returns documents matching `filter` in the store's natural order.
    async fn find(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<Vec<Document>>;

    /// Counts documents matching `filter`, stopping at `limit` when given.
    async fn count(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<u64>;

    /// Replaces the first document matching `filter`.
    async fn replace_one(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        replacement: Document,
    ) -> RepositoryResult<ReplaceOutcome>;

    /// Deletes the first document matching `filter`, returning the number deleted.
    async fn delete_one(&self, binding: &RepositoryConfig, filter: &Filter) -> RepositoryResult<u64>;

    /// Releases backend resources.
    async fn shutdown(self) -> RepositoryResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend + ?Sized,
{
    async fn insert_one(&self, binding: &RepositoryConfig, document: Document) -> RepositoryResult<Bson> {
        (**self).insert_one(binding, document).await
    }

    async fn find(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<Vec<Document>> {
        (**self).find(binding, filter, limit).await
    }

    async fn count(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<u64> {
        (**self).count(binding, filter, limit).await
    }

    async fn replace_one(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        replacement: Document,
    ) -> RepositoryResult<ReplaceOutcome> {
        (**self).replace_one(binding, filter, replacement).await
    }

    async fn delete_one(&self, binding: &RepositoryConfig, filter: &Filter) -> RepositoryResult<u64> {
        (**self).delete_one(binding, filter).await
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend + ?Sized,
{
    async fn insert_one(&self, binding: &RepositoryConfig, document: Document) -> RepositoryResult<Bson> {
        (**self).insert_one(binding, document).await
    }

    async fn find(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<Vec<Document>> {
        (**self).find(binding, filter, limit).await
    }

    async fn count(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<u64> {
        (**self).count(binding, filter, limit).await
    }

    async fn replace_one(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        replacement: Document,
    ) -> RepositoryResult<ReplaceOutcome> {
        (**self).replace_one(binding, filter, replacement).await
    }

    async fn delete_one(&self, binding: &RepositoryConfig, filter: &Filter) -> RepositoryResult<u64> {
        (**self).delete_one(binding, filter).await
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> RepositoryResult<Self::Backend>;
}

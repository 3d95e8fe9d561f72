//! In-memory storage implementation for repositories.
//!
//! This module provides an in-memory backend that keeps documents in
//! insertion order per (database, collection) binding, behind an async-safe
//! read-write lock.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;

use docrepo_core::{
    backend::{ReplaceOutcome, StoreBackend, StoreBackendBuilder},
    config::RepositoryConfig,
    document::ID_FIELD,
    error::{RepositoryError, RepositoryResult},
    query::Filter,
};

use crate::evaluator::{Comparable, DocumentEvaluator};

type CollectionKey = (String, String);
type StoreMap = HashMap<CollectionKey, Vec<Document>>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so
/// clones share the same data. It mirrors the store behaviors a repository
/// relies on:
///
/// - an `ObjectId` is assigned to documents inserted without `_id`
/// - inserting an `_id` that already exists fails with [`RepositoryError::DuplicateKey`]
/// - a replacement without `_id` keeps the stored one, and one with a
///   different `_id` is rejected
///
/// # Performance
///
/// Every lookup scans the collection; there is no indexing.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryStore;
/// use docrepo::{backend::StoreBackend, config::RepositoryConfig, query::Filter};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let binding = RepositoryConfig::new("users", "app");
///
/// store.insert_one(&binding, doc! { "_id": "a1", "name": "Alice" }).await?;
/// assert_eq!(store.count(&binding, &Filter::all(), None).await?, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// (database, collection) -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Returns the names of collections holding documents in `database`.
    pub async fn list_collections(&self, database: &str) -> Vec<String> {
        let mut names = self
            .store
            .read()
            .await
            .iter()
            .filter(|((db, _), documents)| db == database && !documents.is_empty())
            .map(|((_, collection), _)| collection.clone())
            .collect::<Vec<_>>();

        names.sort();
        names
    }

    fn key(binding: &RepositoryConfig) -> CollectionKey {
        (binding.database_name.clone(), binding.collection_name.clone())
    }

    fn with_id(document: Document) -> (Bson, Document) {
        if let Some(id) = document.get(ID_FIELD) {
            return (id.clone(), document);
        }

        let id = Bson::ObjectId(ObjectId::new());
        let mut stored = Document::new();
        stored.insert(ID_FIELD, id.clone());
        for (key, value) in document {
            stored.insert(key, value);
        }

        (id, stored)
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_one(&self, binding: &RepositoryConfig, document: Document) -> RepositoryResult<Bson> {
        let (id, document) = Self::with_id(document);
        let mut store = self.store.write().await;
        let documents = store.entry(Self::key(binding)).or_default();

        let taken = documents.iter().any(|existing| {
            existing
                .get(ID_FIELD)
                .is_some_and(|existing_id| Comparable::from(existing_id) == Comparable::from(&id))
        });
        if taken {
            return Err(RepositoryError::DuplicateKey(format!(
                "{}.{} already contains _id {}",
                binding.database_name, binding.collection_name, id
            )));
        }

        documents.push(document);

        Ok(id)
    }

    async fn find(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(&Self::key(binding)) else {
            return Ok(vec![]);
        };

        Ok(DocumentEvaluator::matching_positions(documents, filter, limit)?
            .into_iter()
            .map(|position| documents[position].clone())
            .collect())
    }

    async fn count(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<u64> {
        let store = self.store.read().await;
        let Some(documents) = store.get(&Self::key(binding)) else {
            return Ok(0);
        };

        Ok(DocumentEvaluator::matching_positions(documents, filter, limit)?.len() as u64)
    }

    async fn replace_one(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        replacement: Document,
    ) -> RepositoryResult<ReplaceOutcome> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(&Self::key(binding)) else {
            return Ok(ReplaceOutcome::default());
        };
        let Some(position) = DocumentEvaluator::matching_positions(documents, filter, Some(1))?
            .into_iter()
            .next()
        else {
            return Ok(ReplaceOutcome::default());
        };

        let current = &documents[position];
        let current_id = current.get(ID_FIELD).cloned().unwrap_or(Bson::Null);

        let replacement = match replacement.get(ID_FIELD).cloned() {
            Some(new_id) if Comparable::from(&new_id) != Comparable::from(&current_id) => {
                return Err(RepositoryError::InvalidDocument(format!(
                    "replacement would change _id from {} to {}",
                    current_id, new_id
                )));
            }
            Some(_) => replacement,
            None => {
                let mut stored = Document::new();
                stored.insert(ID_FIELD, current_id);
                for (key, value) in replacement {
                    stored.insert(key, value);
                }
                stored
            }
        };

        let modified = u64::from(*current != replacement);
        documents[position] = replacement;

        Ok(ReplaceOutcome { matched: 1, modified })
    }

    async fn delete_one(&self, binding: &RepositoryConfig, filter: &Filter) -> RepositoryResult<u64> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(&Self::key(binding)) else {
            return Ok(0);
        };

        match DocumentEvaluator::matching_positions(documents, filter, Some(1))?
            .into_iter()
            .next()
        {
            Some(position) => {
                documents.remove(position);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryStore;
/// use docrepo::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

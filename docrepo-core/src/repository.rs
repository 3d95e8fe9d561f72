//! The generic repository: typed CRUD over one collection.
//!
//! [`GenericRepository`] binds an [`Entity`] type to a single (database,
//! collection) pair and translates typed intents into store requests:
//!
//! | Operation | Store request |
//! |---|---|
//! | [`add`](GenericRepository::add) | insert one |
//! | [`delete`](GenericRepository::delete) | delete one by example |
//! | `exists_by_*` | find, limited to one document |
//! | [`get_all`](GenericRepository::get_all), `find_all_by_*` | find |
//! | `find_by_*` | find, limited to one document |
//! | [`update`](GenericRepository::update), [`update_by_field`](GenericRepository::update_by_field) | replace one |
//!
//! Mutations are unconditional: there is no lookup before a delete or a
//! replace. When the store reports that nothing matched, the operation fails
//! with [`RepositoryError::NotFound`] carrying the filter.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//!
//! let users = GenericRepository::<User, _>::new(
//!     InMemoryStore::new(),
//!     RepositoryConfig::new("users", "app"),
//! )?;
//!
//! users.add(&user).await?;
//! let found = users.find_by_field("_id", "a1").await?;
//! ```

use std::{fmt, marker::PhantomData};

use bson::{Bson, Document};
use tracing::{debug, warn};

use crate::{
    backend::StoreBackend,
    config::{RepositoryConfig, RepositorySettings},
    document::{Entity, EntityExt, ID_FIELD},
    error::{RepositoryError, RepositoryResult},
    query::Filter,
};

/// A repository of `T` entities stored in one collection of backend `B`.
///
/// The binding is resolved once at construction and never changes. The
/// repository holds no other state, so it can be shared between tasks.
pub struct GenericRepository<T: Entity, B: StoreBackend> {
    backend: B,
    config: RepositoryConfig,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity, B: StoreBackend> fmt::Debug for GenericRepository<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRepository")
            .field("entity", &T::entity_name())
            .field("config", &self.config)
            .field("backend", &self.backend)
            .finish()
    }
}

impl<T: Entity, B: StoreBackend + Clone> Clone for GenericRepository<T, B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            config: self.config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity, B: StoreBackend> GenericRepository<T, B> {
    /// Creates a repository bound to the given collection.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ConfigurationMissing`] if either name is blank.
    /// The backend is not contacted.
    pub fn new(backend: B, config: RepositoryConfig) -> RepositoryResult<Self> {
        config.validate()?;

        debug!(
            entity = T::entity_name(),
            database = %config.database_name,
            collection = %config.collection_name,
            "repository bound"
        );

        Ok(Self { backend, config, _marker: PhantomData })
    }

    /// Creates a repository whose binding is looked up by `T::entity_name()`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ConfigurationMissing`] naming the missing key.
    pub fn from_settings(backend: B, settings: &RepositorySettings) -> RepositoryResult<Self> {
        Self::new(backend, settings.resolve(T::entity_name())?)
    }

    /// Returns the collection binding.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Inserts a new entity.
    pub async fn add(&self, entity: &T) -> RepositoryResult<()> {
        let document = entity.to_document()?;
        let id = self.backend.insert_one(&self.config, document).await?;

        debug!(collection = %self.config.collection_name, id = %id, "entity added");

        Ok(())
    }

    /// Deletes the document structurally matching `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no document matched.
    pub async fn delete(&self, entity: &T) -> RepositoryResult<()> {
        let filter = Filter::example(entity.to_document()?);
        let deleted = self.backend.delete_one(&self.config, &filter).await?;

        if deleted == 0 {
            warn!(collection = %self.config.collection_name, %filter, "delete matched nothing");
            return Err(RepositoryError::NotFound(filter));
        }

        debug!(collection = %self.config.collection_name, %filter, "entity deleted");

        Ok(())
    }

    /// Returns whether a document with `key == value` exists.
    pub async fn exists_by_field(&self, key: &str, value: impl Into<Bson>) -> RepositoryResult<bool> {
        self.exists(Filter::field(key, value)).await
    }

    /// Returns whether a document structurally matching `entity` exists.
    pub async fn exists_by_example(&self, entity: &T) -> RepositoryResult<bool> {
        self.exists(Filter::example(entity.to_document()?)).await
    }

    /// Returns whether a document matching the native filter exists.
    pub async fn exists_by_filter(&self, query: Document) -> RepositoryResult<bool> {
        self.exists(Filter::raw(query)).await
    }

    /// Returns every entity in the collection, in the store's natural order.
    pub async fn get_all(&self) -> RepositoryResult<Vec<T>> {
        self.find_all(Filter::all()).await
    }

    /// Returns every entity matching the native filter.
    pub async fn find_all_by_filter(&self, query: Document) -> RepositoryResult<Vec<T>> {
        self.find_all(Filter::raw(query)).await
    }

    /// Returns every entity with `key == value`.
    pub async fn find_all_by_field(&self, key: &str, value: impl Into<Bson>) -> RepositoryResult<Vec<T>> {
        self.find_all(Filter::field(key, value)).await
    }

    /// Returns the first entity structurally matching `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if nothing matched.
    pub async fn find_by_example(&self, entity: &T) -> RepositoryResult<T> {
        self.find_one(Filter::example(entity.to_document()?)).await
    }

    /// Returns the first entity matching the native filter.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if nothing matched.
    pub async fn find_by_filter(&self, query: Document) -> RepositoryResult<T> {
        self.find_one(Filter::raw(query)).await
    }

    /// Returns the first entity with `key == value`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] carrying `key` and `value` if nothing matched.
    pub async fn find_by_field(&self, key: &str, value: impl Into<Bson>) -> RepositoryResult<T> {
        self.find_one(Filter::field(key, value)).await
    }

    /// Replaces the first document with `key == value` by `source`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if nothing matched.
    pub async fn update_by_field(
        &self,
        key: &str,
        value: impl Into<Bson>,
        source: &T,
    ) -> RepositoryResult<()> {
        self.replace(Filter::field(key, value), source).await
    }

    /// Replaces the document whose `_id` equals `source.id()`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no document has that id.
    pub async fn update(&self, source: &T) -> RepositoryResult<()> {
        self.replace(Filter::field(ID_FIELD, source.id()), source).await
    }

    /// Existence is a single-result lookup, so it agrees with `find_by_*`
    /// even when a matching document does not deserialize into `T`.
    async fn exists(&self, filter: Filter) -> RepositoryResult<bool> {
        match self.find_one(filter).await {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn find_all(&self, filter: Filter) -> RepositoryResult<Vec<T>> {
        let documents = self.backend.find(&self.config, &filter, None).await?;

        debug!(
            collection = %self.config.collection_name,
            %filter,
            count = documents.len(),
            "entities fetched"
        );

        documents
            .into_iter()
            .map(T::from_document)
            .collect::<RepositoryResult<Vec<T>>>()
    }

    async fn find_one(&self, filter: Filter) -> RepositoryResult<T> {
        let document = self
            .backend
            .find(&self.config, &filter, Some(1))
            .await?
            .into_iter()
            .next();

        match document {
            Some(document) => T::from_document(document),
            None => {
                debug!(collection = %self.config.collection_name, %filter, "no entity matched");
                Err(RepositoryError::NotFound(filter))
            }
        }
    }

    async fn replace(&self, filter: Filter, source: &T) -> RepositoryResult<()> {
        let replacement = source.to_document()?;
        let outcome = self.backend.replace_one(&self.config, &filter, replacement).await?;

        if outcome.matched == 0 {
            warn!(collection = %self.config.collection_name, %filter, "update matched nothing");
            return Err(RepositoryError::NotFound(filter));
        }

        debug!(
            collection = %self.config.collection_name,
            %filter,
            modified = outcome.modified,
            "entity replaced"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use bson::doc;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::backend::ReplaceOutcome;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        #[serde(rename = "_id")]
        id: String,
        name: String,
    }

    impl Entity for Widget {
        fn id(&self) -> Bson {
            Bson::String(self.id.clone())
        }

        fn entity_name() -> &'static str {
            "Widget"
        }
    }

    /// Backend that records the filters it receives and returns canned results.
    #[derive(Debug, Default)]
    struct RecordingBackend {
        calls: AtomicUsize,
        filters: Mutex<Vec<(Filter, Option<u64>)>>,
        documents: Vec<Document>,
        affected: u64,
    }

    impl RecordingBackend {
        fn returning(documents: Vec<Document>, affected: u64) -> Self {
            Self { documents, affected, ..Default::default() }
        }

        fn record(&self, filter: &Filter, limit: Option<u64>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.filters.lock().unwrap().push((filter.clone(), limit));
        }

        fn last(&self) -> (Filter, Option<u64>) {
            self.filters.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl StoreBackend for RecordingBackend {
        async fn insert_one(&self, _binding: &RepositoryConfig, document: Document) -> RepositoryResult<Bson> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(document.get(ID_FIELD).cloned().unwrap_or(Bson::Null))
        }

        async fn find(
            &self,
            _binding: &RepositoryConfig,
            filter: &Filter,
            limit: Option<u64>,
        ) -> RepositoryResult<Vec<Document>> {
            self.record(filter, limit);
            Ok(self.documents.clone())
        }

        async fn count(
            &self,
            _binding: &RepositoryConfig,
            filter: &Filter,
            limit: Option<u64>,
        ) -> RepositoryResult<u64> {
            self.record(filter, limit);
            Ok(self.documents.len() as u64)
        }

        async fn replace_one(
            &self,
            _binding: &RepositoryConfig,
            filter: &Filter,
            _replacement: Document,
        ) -> RepositoryResult<ReplaceOutcome> {
            self.record(filter, None);
            Ok(ReplaceOutcome { matched: self.affected, modified: self.affected })
        }

        async fn delete_one(&self, _binding: &RepositoryConfig, filter: &Filter) -> RepositoryResult<u64> {
            self.record(filter, None);
            Ok(self.affected)
        }
    }

    fn widget() -> Widget {
        Widget { id: "w1".into(), name: "gear".into() }
    }

    fn binding() -> RepositoryConfig {
        RepositoryConfig::new("widgets", "inventory")
    }

    #[test]
    fn missing_names_fail_before_backend_access() {
        let backend = RecordingBackend::default();

        let err = GenericRepository::<Widget, _>::new(&backend, RepositoryConfig::new("", "inventory"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationMissing(_)));

        let err = GenericRepository::<Widget, _>::from_settings(&backend, &RepositorySettings::new())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationMissing(_)));

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn settings_are_keyed_by_entity_name() {
        let settings = RepositorySettings::from_pairs([
            ("MongoGenericRepo:Widget:Collection", "widgets"),
            ("MongoGenericRepo:Widget:Database", "inventory"),
        ]);

        let repo = GenericRepository::<Widget, _>::from_settings(RecordingBackend::default(), &settings)
            .unwrap();

        assert_eq!(repo.config(), &binding());
    }

    #[tokio::test]
    async fn find_by_field_uses_equality_filter_with_limit_one() {
        let backend = RecordingBackend::returning(vec![doc! { "_id": "w1", "name": "gear" }], 0);
        let repo = GenericRepository::<Widget, _>::new(&backend, binding()).unwrap();

        let found = repo.find_by_field("name", "gear").await.unwrap();

        assert_eq!(found, widget());
        assert_eq!(backend.last(), (Filter::field("name", "gear"), Some(1)));
    }

    #[tokio::test]
    async fn find_by_field_without_match_carries_criteria() {
        let backend = RecordingBackend::default();
        let repo = GenericRepository::<Widget, _>::new(&backend, binding()).unwrap();

        let err = repo.find_by_field("_id", "missing").await.unwrap_err();

        assert_eq!(err.not_found_filter(), Some(&Filter::field("_id", "missing")));
    }

    #[tokio::test]
    async fn exists_fetches_a_single_document() {
        let backend = RecordingBackend::default();
        let repo = GenericRepository::<Widget, _>::new(&backend, binding()).unwrap();

        assert!(!repo.exists_by_example(&widget()).await.unwrap());

        let (filter, limit) = backend.last();
        assert!(matches!(filter, Filter::Example(_)));
        assert_eq!(limit, Some(1));
    }

    #[tokio::test]
    async fn exists_fails_like_find_on_undecodable_documents() {
        let backend = RecordingBackend::returning(vec![doc! { "_id": "w1" }], 0);
        let repo = GenericRepository::<Widget, _>::new(&backend, binding()).unwrap();

        let exists = repo.exists_by_field("_id", "w1").await.unwrap_err();
        let found = repo.find_by_field("_id", "w1").await.unwrap_err();

        assert!(matches!(exists, RepositoryError::Serialization(_)));
        assert!(matches!(found, RepositoryError::Serialization(_)));
    }

    #[tokio::test]
    async fn update_targets_the_identifier() {
        let backend = RecordingBackend::returning(vec![], 1);
        let repo = GenericRepository::<Widget, _>::new(&backend, binding()).unwrap();

        repo.update(&widget()).await.unwrap();

        assert_eq!(backend.last().0, Filter::field("_id", "w1"));
    }

    #[tokio::test]
    async fn zero_matches_turn_mutations_into_not_found() {
        let backend = RecordingBackend::returning(vec![], 0);
        let repo = GenericRepository::<Widget, _>::new(&backend, binding()).unwrap();

        assert!(repo.update(&widget()).await.unwrap_err().is_not_found());
        assert!(repo.update_by_field("name", "gear", &widget()).await.unwrap_err().is_not_found());
        assert!(repo.delete(&widget()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn get_all_deserializes_every_document() {
        let backend = RecordingBackend::returning(
            vec![doc! { "_id": "w1", "name": "gear" }, doc! { "_id": "w2", "name": "cog" }],
            0,
        );
        let repo = GenericRepository::<Widget, _>::new(&backend, binding()).unwrap();

        let all = repo.get_all().await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(backend.last(), (Filter::all(), None));
    }
}

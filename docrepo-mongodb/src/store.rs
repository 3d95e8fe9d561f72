use async_trait::async_trait;
use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, CountOptions, FindOptions},
};
use tracing::debug;

use docrepo_core::{
    backend::{ReplaceOutcome, StoreBackend, StoreBackendBuilder},
    config::RepositoryConfig,
    error::{RepositoryError, RepositoryResult},
    query::{Filter, FilterVisitor},
};

use crate::query::MongoFilterTranslator;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB-backed [`StoreBackend`].
///
/// Cloning is cheap: clones share the driver's connection pool.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
}

impl MongoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn builder(dsn: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn)
    }

    /// Returns the underlying driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_collection(&self, binding: &RepositoryConfig) -> MongoCollection<Document> {
        self.client
            .database(&binding.database_name)
            .collection(&binding.collection_name)
    }

    fn translate(filter: &Filter) -> RepositoryResult<Document> {
        MongoFilterTranslator.visit_filter(filter)
    }
}

/// Maps driver errors, singling out duplicate key violations.
pub(crate) fn map_error(error: MongoError) -> RepositoryError {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE => {
            RepositoryError::DuplicateKey(write_error.message.clone())
        }
        _ => RepositoryError::Backend(error.to_string()),
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_one(&self, binding: &RepositoryConfig, document: Document) -> RepositoryResult<Bson> {
        let result = self
            .get_collection(binding)
            .insert_one(document)
            .await
            .map_err(map_error)?;

        Ok(result.inserted_id)
    }

    async fn find(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<Vec<Document>> {
        let query = Self::translate(filter)?;
        let mut options = FindOptions::default();

        if let Some(limit) = limit {
            options.limit = Some(limit as i64);
        }

        debug!(
            database = %binding.database_name,
            collection = %binding.collection_name,
            query = %query,
            "find"
        );

        self.get_collection(binding)
            .find(query)
            .with_options(options)
            .await
            .map_err(map_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(map_error)
    }

    async fn count(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<u64> {
        let query = Self::translate(filter)?;
        let mut options = CountOptions::default();
        options.limit = limit;

        self.get_collection(binding)
            .count_documents(query)
            .with_options(options)
            .await
            .map_err(map_error)
    }

    async fn replace_one(
        &self,
        binding: &RepositoryConfig,
        filter: &Filter,
        replacement: Document,
    ) -> RepositoryResult<ReplaceOutcome> {
        let result = self
            .get_collection(binding)
            .replace_one(Self::translate(filter)?, replacement)
            .await
            .map_err(map_error)?;

        Ok(ReplaceOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, binding: &RepositoryConfig, filter: &Filter) -> RepositoryResult<u64> {
        let result = self
            .get_collection(binding)
            .delete_one(Self::translate(filter)?)
            .await
            .map_err(map_error)?;

        Ok(result.deleted_count)
    }

    async fn shutdown(self) -> RepositoryResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    app_name: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            app_name: None,
        }
    }

    /// Sets the application name reported to the server.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_string());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| RepositoryError::Initialization(e.to_string()))?;

        if let Some(app_name) = self.app_name {
            options.app_name = Some(app_name);
        }

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| RepositoryError::Initialization(e.to_string()))?,
        ))
    }
}

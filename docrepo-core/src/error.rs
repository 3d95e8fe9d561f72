//! Error types and result types for repository operations.
//!
//! Use [`RepositoryResult<T>`] as the return type for fallible operations.
//! Store failures are propagated as-is; the repository layer never retries.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use serde_yaml::Error as SerdeYamlError;
use thiserror::Error;

use crate::query::Filter;

/// Represents all possible errors that can occur when working with a repository.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// A collection or database name could not be resolved when building a repository.
    /// Carries the configuration key that was missing.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),
    /// No document matched the lookup. Carries the filter that was used.
    #[error("{0} was not found")]
    NotFound(Filter),
    /// A document with the same `_id` already exists in the collection.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    /// Serialization/deserialization error when converting between entities and documents.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The document has an invalid structure for the requested operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Error during backend construction, settings loading, or tracing setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    /// Returns `true` if this error reports a lookup without matches.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }

    /// Returns the filter carried by a [`RepositoryError::NotFound`].
    pub fn not_found_filter(&self) -> Option<&Filter> {
        match self {
            RepositoryError::NotFound(filter) => Some(filter),
            _ => None,
        }
    }
}

/// A specialized `Result` type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<BsonError> for RepositoryError {
    fn from(err: BsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RepositoryError {
    fn from(err: SerdeJsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<SerdeYamlError> for RepositoryError {
    fn from(err: SerdeYamlError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

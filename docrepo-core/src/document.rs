//! Core traits for entity representation and serialization.
//!
//! Every type stored through a repository implements [`Entity`]. The
//! [`EntityExt`] extension converts entities to and from store-native BSON
//! documents (and JSON, for diagnostics).

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::{RepositoryError, RepositoryResult};

/// Name of the identifier field in stored documents.
pub const ID_FIELD: &str = "_id";

/// Core trait that all entities stored in a repository must implement.
///
/// The identifier must serialize to the `_id` field so that it round-trips
/// through the store unchanged.
///
/// # Example
///
/// ```ignore
/// use docrepo::document::Entity;
/// use bson::Bson;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// pub struct User {
///     #[serde(rename = "_id")]
///     pub id: String,
///     pub name: String,
/// }
///
/// impl Entity for User {
///     fn id(&self) -> Bson {
///         Bson::String(self.id.clone())
///     }
///
///     fn entity_name() -> &'static str {
///         "User"
///     }
/// }
/// ```
///
/// `#[derive(Entity)]` from the `docrepo` crate generates the same impl.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns this entity's identifier as it is stored under `_id`.
    fn id(&self) -> Bson;

    /// Returns the logical name used to look up this entity's collection binding.
    fn entity_name() -> &'static str;
}

/// Extension trait providing conversion utilities for entities.
///
/// Automatically implemented for all types that implement [`Entity`].
pub trait EntityExt: Entity {
    /// Serializes this entity into a BSON document.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidDocument`] if the entity does not
    /// serialize to a document (for example a newtype over a string).
    fn to_document(&self) -> RepositoryResult<Document>;

    /// Deserializes an entity from a BSON document.
    fn from_document(document: Document) -> RepositoryResult<Self>;

    /// Converts this entity to a JSON value.
    fn to_json(&self) -> RepositoryResult<Value>;

    /// Creates an entity from a JSON value.
    fn from_json(value: Value) -> RepositoryResult<Self>;
}

impl<E: Entity> EntityExt for E {
    fn to_document(&self) -> RepositoryResult<Document> {
        match serialize_to_bson(self)? {
            Bson::Document(document) => Ok(document),
            other => Err(RepositoryError::InvalidDocument(format!(
                "{} serialized to {:?}, expected a document",
                E::entity_name(),
                other.element_type(),
            ))),
        }
    }

    fn from_document(document: Document) -> RepositoryResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }

    fn to_json(&self) -> RepositoryResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> RepositoryResult<Self> {
        Ok(from_value(value)?)
    }
}

//! Main docrepo crate providing a generic repository over document databases.
//!
//! This crate is the primary entry point for users of docrepo. It re-exports the
//! core types from the sub-crates, the `Entity` derive, and the storage backends.
//!
//! # Features
//!
//! - **Typed repositories** - One `GenericRepository<T, B>` per entity type and collection
//! - **Multiple backends** - In-memory and MongoDB storage behind the `StoreBackend` trait
//! - **Flexible filters** - Raw store queries, single-field equality and by-example matching
//! - **Settings-driven bindings** - Collection and database names resolved from JSON, YAML or env
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, docrepo::Entity)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     docrepo::telemetry::init_tracing(&docrepo::telemetry::LoggingConfig::from_env())?;
//!
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.repository::<User>(RepositoryConfig::new("users", "app"))?;
//!
//!     users.add(&User { id: "a1".into(), name: "Alice".into() }).await?;
//!
//!     let alice = users.find_by_field("name", "Alice").await?;
//!     println!("Found user: {:?}", alice);
//!
//!     users.delete(&alice).await?;
//!     store.shutdown().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Settings
//!
//! Bindings can be kept out of code. Each entity reads its collection and
//! database from the `MongoGenericRepo` section, keyed by its entity name:
//!
//! ```json
//! {
//!   "MongoGenericRepo": {
//!     "User": { "Collection": "users", "Database": "app" }
//!   }
//! }
//! ```
//!
//! ```ignore
//! let settings = RepositorySettings::from_file("appsettings.json")?
//!     .merge(RepositorySettings::from_env());
//! let users = store.repository_from_settings::<User>(&settings)?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docrepo;

pub mod prelude;
pub mod telemetry;

pub use docrepo_core::{backend, config, document, error, query, repository, store};
pub use docrepo_macros::Entity;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrepo_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrepo_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}

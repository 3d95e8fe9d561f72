//! Convenient re-exports of commonly used types from docrepo.
//!
//! ```ignore
//! use docrepo::prelude::*;
//! ```

pub use docrepo_core::{
    backend::{ReplaceOutcome, StoreBackend, StoreBackendBuilder},
    config::{RepositoryConfig, RepositorySettings},
    document::{Entity, EntityExt, ID_FIELD},
    error::{RepositoryError, RepositoryResult},
    query::{Filter, FilterVisitor},
    repository::GenericRepository,
    store::DocumentStore,
};

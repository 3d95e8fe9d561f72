//! A generic repository abstraction over document databases.
//!
//! This crate is the core of the docrepo project and provides:
//!
//! - **Entity traits** ([`document`]) - Core traits for identifying and serializing entities
//! - **Filters** ([`query`]) - Raw, field-equality and by-example filters
//! - **Store backend abstraction** ([`backend`]) - The seam to concrete document stores
//! - **Generic repository** ([`repository`]) - Typed CRUD and existence checks over one collection
//! - **Configuration** ([`config`]) - Collection bindings and the settings they come from
//! - **Document store** ([`store`]) - Owns a backend and hands out repositories
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{document::Entity, repository::GenericRepository, config::RepositoryConfig};
//! use bson::Bson;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! impl Entity for User {
//!     fn id(&self) -> Bson {
//!         Bson::String(self.id.clone())
//!     }
//!
//!     fn entity_name() -> &'static str {
//!         "User"
//!     }
//! }
//!
//! let users = GenericRepository::<User, _>::new(backend, RepositoryConfig::new("users", "app"))?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_core;

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod query;
pub mod repository;
pub mod store;

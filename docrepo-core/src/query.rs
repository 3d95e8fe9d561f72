//! Filter model for repository lookups.
//!
//! A repository exposes three query styles, each with its own explicitly named
//! operation rather than overload dispatch:
//!
//! - **Raw filter** ([`Filter::Raw`]) - an arbitrary store-native filter document
//! - **Field equality** ([`Filter::Field`]) - a single exact match on one field
//! - **Example** ([`Filter::Example`]) - a structural match on a serialized entity
//!
//! Backends consume filters through the [`FilterVisitor`] trait: the MongoDB
//! backend translates them into query documents while the in-memory backend
//! evaluates them directly against stored documents.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::query::Filter;
//! use bson::doc;
//!
//! let by_name = Filter::field("name", "Alice");
//! let adults = Filter::raw(doc! { "age": { "$gte": 18 } });
//! ```

use std::fmt;

use bson::{Bson, Document};

use crate::error::RepositoryError;

/// A predicate over document fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// An arbitrary store-native filter document.
    Raw(Document),
    /// Exact equality on a single field.
    Field {
        /// The field name, dotted paths address nested documents.
        key: String,
        /// The value the field must equal.
        value: Bson,
    },
    /// Structural match on every top-level field of a serialized entity.
    Example(Document),
}

impl Filter {
    /// Creates a raw filter from a native document.
    pub fn raw(document: Document) -> Self {
        Filter::Raw(document)
    }

    /// Creates a single-field equality filter.
    pub fn field(key: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Field { key: key.into(), value: value.into() }
    }

    /// Creates an example filter from a serialized entity.
    pub fn example(document: Document) -> Self {
        Filter::Example(document)
    }

    /// A filter matching every document in the collection.
    pub fn all() -> Self {
        Filter::Raw(Document::new())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Raw(query) => write!(f, "query ({})", query),
            Filter::Field { key, value } => write!(f, "{} ({})", key, value),
            Filter::Example(document) => write!(f, "entity ({})", document),
        }
    }
}

/// Visitor over the three filter styles.
///
/// Implementors either translate a filter into a backend-native form or
/// evaluate it against a document.
pub trait FilterVisitor {
    type Output;
    type Error: Into<RepositoryError>;

    fn visit_raw(&mut self, query: &Document) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, key: &str, value: &Bson) -> Result<Self::Output, Self::Error>;
    fn visit_example(&mut self, document: &Document) -> Result<Self::Output, Self::Error>;

    fn visit_filter(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error> {
        match filter {
            Filter::Raw(query) => self.visit_raw(query),
            Filter::Field { key, value } => self.visit_field(key, value),
            Filter::Example(document) => self.visit_example(document),
        }
    }
}

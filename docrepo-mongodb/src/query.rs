//! Filter translation from repository filters to MongoDB query documents.

use bson::{Bson, Document, doc};

use docrepo_core::{
    error::RepositoryError,
    query::FilterVisitor,
};

/// Translates repository filters into MongoDB's native query syntax.
///
/// - raw filters are passed through unchanged
/// - field filters become `{ key: { "$eq": value } }`, so a document value is
///   never mistaken for an operator expression
/// - example filters are used as-is, which MongoDB treats as equality on
///   every top-level field
pub(crate) struct MongoFilterTranslator;

impl FilterVisitor for MongoFilterTranslator {
    type Output = Document;
    type Error = RepositoryError;

    fn visit_raw(&mut self, query: &Document) -> Result<Self::Output, Self::Error> {
        Ok(query.clone())
    }

    fn visit_field(&mut self, key: &str, value: &Bson) -> Result<Self::Output, Self::Error> {
        if key.is_empty() {
            return Err(RepositoryError::Backend("equality filter requires a field name".into()));
        }

        Ok(doc! {
            key: { "$eq": value.clone() },
        })
    }

    fn visit_example(&mut self, document: &Document) -> Result<Self::Output, Self::Error> {
        Ok(document.clone())
    }
}

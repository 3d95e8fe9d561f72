//! Filter evaluation for in-memory document matching.
//!
//! This module evaluates repository filters directly against BSON documents,
//! following the store's matching rules for the supported subset:
//!
//! - implicit equality, where an array field also matches any of its elements
//!   and `null` matches a missing field
//! - dotted paths into nested documents and array positions
//! - comparison operators `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`
//! - `$exists` and `$not` on fields, `$and`, `$or` and `$nor` at the top level

use std::cmp::Ordering;

use bson::{Bson, DateTime, Document, oid::ObjectId};

use docrepo_core::{
    error::{RepositoryError, RepositoryResult},
    query::{Filter, FilterVisitor},
};

/// Comparable representation of BSON values.
///
/// `Int32` and `Int64` share the exact [`Comparable::Int`] variant, so that
/// large 64-bit ids stay distinct. Integers are widened to `f64` only when
/// compared against a `Double`. Embedded documents keep their field order.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Document(Vec<(&'a str, Comparable<'a>)>),
    /// Values without a dedicated variant, compared structurally.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Double(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Document(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Double(a), Comparable::Double(b)) => a == b,
            (Comparable::Int(a), Comparable::Double(b)) | (Comparable::Double(b), Comparable::Int(a)) => {
                *a as f64 == *b
            }
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Document(a), Comparable::Document(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Double(a), Comparable::Double(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Double(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Double(a), Comparable::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path such as `address.city` or `tags.0`.
pub(crate) fn lookup<'d>(document: &'d Document, path: &str) -> Option<&'d Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(doc) => doc.get(segment)?,
            Bson::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Equality as the store applies it to a single field.
pub(crate) fn values_equal(field: Option<&Bson>, expected: &Bson) -> bool {
    let expected_cmp = Comparable::from(expected);

    match field {
        None => expected_cmp == Comparable::Null,
        Some(value) => {
            if Comparable::from(value) == expected_cmp {
                return true;
            }

            match value {
                Bson::Array(items) => items
                    .iter()
                    .any(|item| Comparable::from(item) == expected_cmp),
                _ => false,
            }
        }
    }
}

fn compare(field: Option<&Bson>, operand: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let Some(value) = field else {
        return false;
    };
    let operand = Comparable::from(operand);
    let holds = |item: &Bson| {
        Comparable::from(item)
            .partial_cmp(&operand)
            .map(accept)
            .unwrap_or(false)
    };

    match value {
        Bson::Array(items) => items.iter().any(holds),
        other => holds(other),
    }
}

fn is_operator_document(value: &Bson) -> Option<&Document> {
    match value {
        Bson::Document(doc) if doc.keys().next().is_some_and(|k| k.starts_with('$')) => Some(doc),
        _ => None,
    }
}

fn operand_array<'b>(op: &str, operand: &'b Bson) -> RepositoryResult<&'b [Bson]> {
    operand
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| RepositoryError::Backend(format!("{op} operator requires an array value")))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    }
}

/// Evaluates a field condition: either a plain value (equality) or an operator document.
pub(crate) fn matches_condition(field: Option<&Bson>, condition: &Bson) -> RepositoryResult<bool> {
    let Some(operators) = is_operator_document(condition) else {
        return Ok(values_equal(field, condition));
    };

    for (op, operand) in operators {
        let holds = match op.as_str() {
            "$eq" => values_equal(field, operand),
            "$ne" => !values_equal(field, operand),
            "$gt" => compare(field, operand, |o| o == Ordering::Greater),
            "$gte" => compare(field, operand, |o| o != Ordering::Less),
            "$lt" => compare(field, operand, |o| o == Ordering::Less),
            "$lte" => compare(field, operand, |o| o != Ordering::Greater),
            "$in" => operand_array(op, operand)?
                .iter()
                .any(|candidate| values_equal(field, candidate)),
            "$nin" => !operand_array(op, operand)?
                .iter()
                .any(|candidate| values_equal(field, candidate)),
            "$exists" => field.is_some() == truthy(operand),
            "$not" => match operand {
                Bson::Document(_) => !matches_condition(field, operand)?,
                _ => return Err(RepositoryError::Backend("$not operator requires a document".into())),
            },
            other => {
                return Err(RepositoryError::Backend(format!("unsupported query operator {other}")));
            }
        };

        if !holds {
            return Ok(false);
        }
    }

    Ok(true)
}

fn clauses<'b>(op: &str, value: &'b Bson) -> RepositoryResult<Vec<&'b Document>> {
    operand_array(op, value)?
        .iter()
        .map(|clause| {
            clause
                .as_document()
                .ok_or_else(|| RepositoryError::Backend(format!("{op} clauses must be documents")))
        })
        .collect()
}

/// Evaluates a native filter document against one stored document.
pub(crate) fn matches_query(document: &Document, query: &Document) -> RepositoryResult<bool> {
    for (key, condition) in query {
        let holds = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches_query(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" | "$nor" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches_query(document, clause)? {
                        any = true;
                        break;
                    }
                }
                if key == "$or" { any } else { !any }
            }
            other if other.starts_with('$') => {
                return Err(RepositoryError::Backend(format!("unsupported query operator {other}")));
            }
            path => matches_condition(lookup(document, path), condition)?,
        };

        if !holds {
            return Ok(false);
        }
    }

    Ok(true)
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, filter: &Filter) -> RepositoryResult<bool> {
        self.visit_filter(filter)
    }

    /// Returns the positions of matching documents, in order, up to `limit`.
    pub fn matching_positions(
        documents: &[Document],
        filter: &Filter,
        limit: Option<u64>,
    ) -> RepositoryResult<Vec<usize>> {
        let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let mut positions = Vec::new();

        for (position, document) in documents.iter().enumerate() {
            if positions.len() >= limit {
                break;
            }
            if DocumentEvaluator::new(document).evaluate(filter)? {
                positions.push(position);
            }
        }

        Ok(positions)
    }
}

impl<'a> FilterVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = RepositoryError;

    fn visit_raw(&mut self, query: &Document) -> Result<Self::Output, Self::Error> {
        matches_query(self.document, query)
    }

    fn visit_field(&mut self, key: &str, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(values_equal(lookup(self.document, key), value))
    }

    fn visit_example(&mut self, example: &Document) -> Result<Self::Output, Self::Error> {
        Ok(example
            .iter()
            .all(|(key, value)| values_equal(self.document.get(key), value)))
    }
}

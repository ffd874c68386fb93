//! Filter evaluation for in-memory documents.
//!
//! This module matches BSON documents against MongoDB-style filter documents. The supported
//! subset is what collection wrappers send: implicit equality, the comparison operators,
//! `$in`/`$nin`, `$exists` and the `$and`/`$or`/`$nor` combinators, all over dotted paths.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docmodel_core::error::{DocModelError, DocModelResult};


/// Type-erased, comparable representation of BSON values.
///
/// Integers of either width compare exactly as `i64`. Only a comparison involving a double
/// goes through `f64`, so `1`, `1_i64` and `1.0` still compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Anything else is only equal to an identical value.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
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
            (Comparable::Int(a), Comparable::Number(b)) => *a as f64 == *b,
            (Comparable::Number(a), Comparable::Int(b)) => *a == *b as f64,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => Some(a.cmp(b)),
            (Comparable::Int(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Two values are equal under query semantics.
pub(crate) fn values_equal(left: &Bson, right: &Bson) -> bool {
    Comparable::from(left) == Comparable::from(right)
}

/// Collects every value reachable through a dotted `path`.
///
/// Arrays met along the way are traversed element-wise, so `"tags.name"` reaches the `name`
/// of every sub-document in `tags`. Numeric segments also index into arrays.
pub(crate) fn resolve_path<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let mut current = vec![];

    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return current;
    };

    if let Some(value) = document.get(first) {
        current.push(value);
    }

    for segment in segments {
        let mut next = vec![];

        for value in current {
            match value {
                Bson::Document(doc) => next.extend(doc.get(segment)),
                Bson::Array(arr) => match segment.parse::<usize>() {
                    Ok(index) => next.extend(arr.get(index)),
                    Err(_) => next.extend(
                        arr.iter()
                            .filter_map(|item| item.as_document())
                            .filter_map(|doc| doc.get(segment))
                    ),
                },
                _ => {},
            }
        }

        current = next;
    }

    current
}

/// Like [`resolve_path`], but arrays at the end of the path are flattened into their elements
/// and a missing path yields a single `null`.
pub(crate) fn resolve_flattened(document: &Document, path: &str) -> Vec<Bson> {
    let mut values = vec![];

    for value in resolve_path(document, path) {
        match value {
            Bson::Array(arr) => values.extend(arr.iter().cloned()),
            other => values.push(other.clone()),
        }
    }

    if values.is_empty() {
        values.push(Bson::Null);
    }

    values
}

fn is_operator_document(value: &Bson) -> bool {
    value
        .as_document()
        .and_then(|doc| doc.keys().next())
        .is_some_and(|key| key.starts_with('$'))
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Whether the document satisfies every clause of `filter`.
    pub fn matches(&self, filter: &Document) -> DocModelResult<bool> {
        for (key, value) in filter {
            let matched = match key.as_str() {
                "$and" => self.all(Self::clauses(key, value)?)?,
                "$or" => self.any(Self::clauses(key, value)?)?,
                "$nor" => !self.any(Self::clauses(key, value)?)?,
                op if op.starts_with('$') => {
                    return Err(DocModelError::Backend(format!("unknown top level operator: {op}")))
                },
                field => self.field_matches(field, value)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Returns clones of the documents matching `filter`, preserving their order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> DocModelResult<Vec<Document>> {
        let mut matched = vec![];

        for document in documents {
            if DocumentEvaluator::new(document).matches(filter)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }

    fn clauses<'f>(key: &str, value: &'f Bson) -> DocModelResult<Vec<&'f Document>> {
        let invalid = || DocModelError::Backend(format!("{key} must be a nonempty array of documents"));

        let clauses = value
            .as_array()
            .filter(|arr| !arr.is_empty())
            .ok_or_else(invalid)?;

        clauses
            .iter()
            .map(|clause| clause.as_document().ok_or_else(invalid))
            .collect()
    }

    fn all(&self, clauses: Vec<&Document>) -> DocModelResult<bool> {
        for clause in clauses {
            if !self.matches(clause)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn any(&self, clauses: Vec<&Document>) -> DocModelResult<bool> {
        for clause in clauses {
            if self.matches(clause)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn field_matches(&self, field: &str, condition: &Bson) -> DocModelResult<bool> {
        let values = resolve_path(self.document, field);

        if !is_operator_document(condition) {
            return Ok(Self::equals(&values, condition));
        }

        for (op, operand) in condition.as_document().into_iter().flatten() {
            let matched = match op.as_str() {
                "$eq" => Self::equals(&values, operand),
                "$ne" => !Self::equals(&values, operand),
                "$gt" => Self::compare(&values, operand, |o| o == Ordering::Greater),
                "$gte" => Self::compare(&values, operand, |o| o != Ordering::Less),
                "$lt" => Self::compare(&values, operand, |o| o == Ordering::Less),
                "$lte" => Self::compare(&values, operand, |o| o != Ordering::Greater),
                "$in" => Self::in_list(&values, op, operand)?,
                "$nin" => !Self::in_list(&values, op, operand)?,
                "$exists" => !values.is_empty() == Self::truthy(operand),
                other => return Err(DocModelError::Backend(format!("unknown operator: {other}"))),
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Equality with array-membership and missing-as-null semantics.
    fn equals(values: &[&Bson], expected: &Bson) -> bool {
        if values.is_empty() {
            return matches!(expected, Bson::Null);
        }

        values.iter().any(|value| {
            values_equal(value, expected)
                || value
                    .as_array()
                    .is_some_and(|arr| arr.iter().any(|item| values_equal(item, expected)))
        })
    }

    /// Ordered comparison. A missing field orders as null.
    fn compare(values: &[&Bson], operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
        if values.is_empty() {
            return matches!(operand, Bson::Null) && accept(Ordering::Equal);
        }

        let operand = Comparable::from(operand);
        let check = |value: &Bson| {
            Comparable::from(value)
                .partial_cmp(&operand)
                .is_some_and(&accept)
        };

        values.iter().any(|value| match *value {
            Bson::Array(arr) => arr.iter().any(|item| check(item)),
            other => check(other),
        })
    }

    fn in_list(values: &[&Bson], op: &str, operand: &Bson) -> DocModelResult<bool> {
        let candidates = operand
            .as_array()
            .ok_or_else(|| DocModelError::Backend(format!("{op} needs an array")))?;

        Ok(candidates.iter().any(|candidate| Self::equals(values, candidate)))
    }

    fn truthy(value: &Bson) -> bool {
        match value {
            Bson::Boolean(b) => *b,
            Bson::Null => false,
            Bson::Int32(n) => *n != 0,
            Bson::Int64(n) => *n != 0,
            Bson::Double(n) => *n != 0.0,
            _ => true,
        }
    }
}

//! Update operator application for in-memory documents.
//!
//! Supports `$set`, `$unset`, `$inc` and `$push` over dotted paths. Replacement-style
//! payloads are rejected, as they are by the server for find-and-modify updates.

use bson::{Bson, Document};

use docmodel_core::error::{DocModelError, DocModelResult};

use crate::evaluator::values_equal;


fn invalid(message: impl Into<String>) -> DocModelError {
    DocModelError::Backend(message.into())
}

/// Applies every operator of `update` to `document` in place.
///
/// On error `document` may be partially modified; callers work on a copy.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> DocModelResult<()> {
    if update.is_empty() || update.keys().any(|key| !key.starts_with('$')) {
        return Err(invalid("update document requires atomic operators"));
    }

    for (op, fields) in update {
        let fields = fields
            .as_document()
            .ok_or_else(|| invalid(format!("modifiers for {op} must be a document")))?;

        for (path, value) in fields {
            if path == "_id" || path.starts_with("_id.") {
                let unchanged = op == "$set"
                    && document.get("_id").is_some_and(|id| values_equal(id, value));

                if !unchanged {
                    return Err(invalid("performing an update on the path '_id' would modify the immutable field '_id'"));
                }
            }

            match op.as_str() {
                "$set" => set_path(document, path, value.clone())?,
                "$unset" => unset_path(document, path),
                "$inc" => increment(document, path, value)?,
                "$push" => push(document, path, value)?,
                other => return Err(invalid(format!("unknown modifier: {other}"))),
            }
        }
    }

    Ok(())
}

/// Sets `path` to `value`, creating intermediate sub-documents as needed.
pub(crate) fn set_path(document: &mut Document, path: &str, value: Bson) -> DocModelResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path.to_string(), value);
            Ok(())
        },
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head.to_string(), Document::new());
            }

            match document.get_mut(head) {
                Some(Bson::Document(child)) => set_path(child, rest, value),
                _ => Err(invalid(format!("cannot create field '{rest}' in non-document field '{head}'"))),
            }
        },
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        },
        Some((head, rest)) => {
            if let Some(Bson::Document(child)) = document.get_mut(head) {
                unset_path(child, rest);
            }
        },
    }
}

fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    match path.split_once('.') {
        None => document.get(path),
        Some((head, rest)) => match document.get(head) {
            Some(Bson::Document(child)) => get_path(child, rest),
            _ => None,
        },
    }
}

fn increment(document: &mut Document, path: &str, by: &Bson) -> DocModelResult<()> {
    let non_numeric = || invalid(format!("cannot apply $inc to a non-numeric value at '{path}'"));
    let wide = |a: i64, b: i64| {
        a.checked_add(b)
            .map(Bson::Int64)
            .ok_or_else(|| invalid(format!("$inc at '{path}' would overflow a 64-bit integer")))
    };

    let sum = match (get_path(document, path), by) {
        (None, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => by.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Some(Bson::Int32(a)), Bson::Int64(b)) => wide(i64::from(*a), *b)?,
        (Some(Bson::Int64(a)), Bson::Int32(b)) => wide(*a, i64::from(*b))?,
        (Some(Bson::Int64(a)), Bson::Int64(b)) => wide(*a, *b)?,
        (Some(Bson::Double(a)), Bson::Int32(b)) => Bson::Double(a + *b as f64),
        (Some(Bson::Double(a)), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        (Some(Bson::Double(a)), Bson::Double(b)) => Bson::Double(a + b),
        (Some(Bson::Int32(a)), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        (Some(Bson::Int64(a)), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        _ => return Err(non_numeric()),
    };

    set_path(document, path, sum)
}

fn push(document: &mut Document, path: &str, value: &Bson) -> DocModelResult<()> {
    let pushed = match get_path(document, path) {
        None => vec![value.clone()],
        Some(Bson::Array(items)) => {
            let mut items = items.clone();
            items.push(value.clone());
            items
        },
        Some(_) => return Err(invalid(format!("the field '{path}' must be an array"))),
    };

    set_path(document, path, Bson::Array(pushed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn set_and_unset() {
        let mut user = doc! { "name": "Ada", "role": "King", "profile": { "city": "Oslo" } };

        apply_update(&mut user, &doc! {
            "$set": { "role": "Queen", "profile.city": "Bergen", "meta.visits": 1 },
            "$unset": { "name": "" },
        })
        .unwrap();

        assert_eq!(user, doc! {
            "role": "Queen",
            "profile": { "city": "Bergen" },
            "meta": { "visits": 1 },
        });
    }

    #[test]
    fn increments_keep_numeric_width() {
        let mut counter = doc! { "small": 1, "big": 1_i64, "ratio": 0.5 };

        apply_update(&mut counter, &doc! {
            "$inc": { "small": 2, "big": 2, "ratio": 1, "fresh": 4 },
        })
        .unwrap();

        assert_eq!(counter, doc! { "small": 3, "big": 3_i64, "ratio": 1.5, "fresh": 4 });
    }

    #[test]
    fn increments_past_i64_range_fail() {
        let mut counter = doc! { "n": i64::MAX, "m": i64::MIN };

        assert!(apply_update(&mut counter, &doc! { "$inc": { "n": 1_i64 } }).is_err());
        assert!(apply_update(&mut counter, &doc! { "$inc": { "n": 1 } }).is_err());
        assert!(apply_update(&mut counter, &doc! { "$inc": { "m": -1 } }).is_err());
        assert_eq!(counter, doc! { "n": i64::MAX, "m": i64::MIN });

        let mut small = doc! { "n": i32::MAX };
        apply_update(&mut small, &doc! { "$inc": { "n": 1 } }).unwrap();
        assert_eq!(small, doc! { "n": (i64::from(i32::MAX) + 1) });
    }

    #[test]
    fn push_appends_or_creates() {
        let mut post = doc! { "tags": ["a"] };

        apply_update(&mut post, &doc! { "$push": { "tags": "b", "likes": 1 } }).unwrap();

        assert_eq!(post, doc! { "tags": ["a", "b"], "likes": [1] });
    }

    #[test]
    fn rejects_bad_updates() {
        let id = ObjectId::new();
        let mut user = doc! { "_id": id, "name": "Ada" };

        assert!(apply_update(&mut user, &doc! { "name": "Grace" }).is_err());
        assert!(apply_update(&mut user, &doc! {}).is_err());
        assert!(apply_update(&mut user, &doc! { "$rename": { "name": "n" } }).is_err());
        assert!(apply_update(&mut user, &doc! { "$inc": { "name": 1 } }).is_err());
        assert!(apply_update(&mut user, &doc! { "$push": { "name": 1 } }).is_err());
        assert!(apply_update(&mut user, &doc! { "$set": { "_id": ObjectId::new() } }).is_err());
        assert!(apply_update(&mut user, &doc! { "$set": { "name.first": "A" } }).is_err());
        assert!(apply_update(&mut user, &doc! { "$set": { "_id": id } }).is_ok());
    }
}

//! In-memory connection and collection handles.
//!
//! This module provides a backend that keeps every collection of one database as an
//! insertion-ordered list of BSON documents behind an async-aware read-write lock. It
//! evaluates the same filter, update and pipeline documents the MongoDB backend sends to the
//! server, so code written against a [`Connection`](docmodel_core::connection::Connection)
//! behaves the same on either.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};
use tracing::debug;

use docmodel_core::{
    backend::{CollectionBackend, ConnectionBackend, ConnectionBuilder, IndexSpec},
    config::ReturnDocument,
    error::{DocModelError, DocModelResult},
};

use crate::{
    evaluator::{DocumentEvaluator, resolve_flattened, resolve_path, values_equal},
    update::{apply_update, set_path},
};

/// Documents and index definitions of one collection.
#[derive(Debug, Default)]
struct CollectionState {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

type DatabaseMap = HashMap<String, CollectionState>;


/// In-memory stand-in for a database connection.
///
/// Cloning is cheap: clones share the same underlying data, as do all collection handles
/// resolved from them.
///
/// # Example
///
/// ```ignore
/// use docmodel::{prelude::*, memory::InMemoryConnection};
///
/// let connection = Connection::connect(
///     InMemoryConnection::builder("app"),
///     ConnectionConfig::default(),
/// )
/// .await?;
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryConnection {
    database: String,
    store: Arc<RwLock<DatabaseMap>>,
}

impl InMemoryConnection {
    /// Creates an empty database with the given name.
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            store: Arc::new(RwLock::new(DatabaseMap::new())),
        }
    }

    pub fn builder(database: &str) -> InMemoryConnectionBuilder {
        InMemoryConnectionBuilder::new(database)
    }
}

#[async_trait]
impl ConnectionBackend for InMemoryConnection {
    type Collection = InMemoryCollection;

    fn database_name(&self) -> &str {
        &self.database
    }

    fn collection(&self, name: &str) -> InMemoryCollection {
        InMemoryCollection {
            database: self.database.clone(),
            name: name.to_string(),
            store: Arc::clone(&self.store),
        }
    }

    async fn ping(&self) -> DocModelResult<()> {
        Ok(())
    }
}

/// Handle to one collection of an [`InMemoryConnection`].
#[derive(Clone, Debug)]
pub struct InMemoryCollection {
    database: String,
    name: String,
    store: Arc<RwLock<DatabaseMap>>,
}

impl InMemoryCollection {
    fn duplicate_key(&self, index: &str, value: &Bson) -> DocModelError {
        DocModelError::Backend(format!(
            "E11000 duplicate key error collection: {}.{} index: {} dup key: {}",
            self.database, self.name, index, value,
        ))
    }

    /// Index key of `document` for `field`, or `None` if a sparse index skips it.
    fn index_key(document: &Document, index: &IndexSpec) -> Option<Bson> {
        match resolve_path(document, &index.field).first() {
            Some(value) => Some((*value).clone()),
            None if index.sparse => None,
            None => Some(Bson::Null),
        }
    }

    /// The shared key if `a` and `b` collide on `index`.
    fn collision(index: &IndexSpec, a: &Document, b: &Document) -> Option<Bson> {
        let (a, b) = (Self::index_key(a, index)?, Self::index_key(b, index)?);

        values_equal(&a, &b).then_some(a)
    }

    /// Rejects `candidate` if it collides with another document on `_id` or a unique index.
    ///
    /// `skip` is the position of the document being replaced, if any.
    fn check_unique(
        &self,
        state: &CollectionState,
        candidate: &Document,
        skip: Option<usize>,
    ) -> DocModelResult<()> {
        let others = state
            .documents
            .iter()
            .enumerate()
            .filter(|(position, _)| Some(*position) != skip)
            .map(|(_, document)| document);

        for other in others {
            if let (Some(a), Some(b)) = (candidate.get("_id"), other.get("_id")) {
                if values_equal(a, b) {
                    return Err(self.duplicate_key("_id_", a));
                }
            }

            for index in state.indexes.iter().filter(|index| index.unique) {
                if let Some(value) = Self::collision(index, candidate, other) {
                    return Err(self.duplicate_key(&format!("{}_1", index.field), &value));
                }
            }
        }

        Ok(())
    }

    /// Joins `foreign` documents onto `document` as described by a `$lookup` stage.
    fn lookup(document: &mut Document, foreign: &[Document], spec: &LookupSpec) -> DocModelResult<()> {
        let local = resolve_flattened(document, &spec.local_field);

        let joined = foreign
            .iter()
            .filter(|candidate| {
                resolve_flattened(candidate, &spec.foreign_field)
                    .iter()
                    .any(|value| local.iter().any(|l| values_equal(l, value)))
            })
            .cloned()
            .map(Bson::Document)
            .collect::<Vec<_>>();

        set_path(document, &spec.as_field, Bson::Array(joined))
    }
}

/// The fields of a `$lookup` stage.
struct LookupSpec {
    from: String,
    local_field: String,
    foreign_field: String,
    as_field: String,
}

impl LookupSpec {
    fn parse(stage: &Document) -> DocModelResult<Self> {
        let field = |name: &str| {
            stage
                .get(name)
                .and_then(Bson::as_str)
                .map(str::to_string)
                .ok_or_else(|| DocModelError::Backend(format!("$lookup requires a string '{name}' field")))
        };

        Ok(Self {
            from: field("from")?,
            local_field: field("localField")?,
            foreign_field: field("foreignField")?,
            as_field: field("as")?,
        })
    }
}

#[async_trait]
impl CollectionBackend for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_one(&self, filter: Document) -> DocModelResult<Option<Document>> {
        let store = self.store.read().await;
        let Some(state) = store.get(&self.name) else {
            return Ok(None);
        };

        for document in &state.documents {
            if DocumentEvaluator::new(document).matches(&filter)? {
                return Ok(Some(document.clone()));
            }
        }

        Ok(None)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        return_document: ReturnDocument,
    ) -> DocModelResult<Option<Document>> {
        let mut store = self.store.write().await;
        let Some(state) = store.get_mut(&self.name) else {
            return Ok(None);
        };

        let mut position = None;
        for (i, document) in state.documents.iter().enumerate() {
            if DocumentEvaluator::new(document).matches(&filter)? {
                position = Some(i);
                break;
            }
        }

        let Some(position) = position else {
            return Ok(None);
        };

        let before = state.documents[position].clone();
        let mut after = before.clone();
        apply_update(&mut after, &update)?;
        self.check_unique(state, &after, Some(position))?;

        state.documents[position] = after.clone();

        Ok(Some(match return_document {
            ReturnDocument::Before => before,
            ReturnDocument::After => after,
        }))
    }

    async fn insert_one(&self, document: Document) -> DocModelResult<Bson> {
        let document = match document.get("_id") {
            Some(_) => document,
            None => {
                let mut with_id = Document::new();
                with_id.insert("_id", ObjectId::new());
                for (key, value) in document {
                    with_id.insert(key, value);
                }
                with_id
            },
        };

        let id = document
            .get("_id")
            .cloned()
            .unwrap_or(Bson::Null);

        let mut store = self.store.write().await;
        let state = store
            .entry(self.name.clone())
            .or_default();

        self.check_unique(state, &document, None)?;
        state.documents.push(document);

        Ok(id)
    }

    async fn find(&self, filter: Document) -> DocModelResult<Vec<Document>> {
        let store = self.store.read().await;

        match store.get(&self.name) {
            Some(state) => DocumentEvaluator::filter_documents(&state.documents, &filter),
            None => Ok(vec![]),
        }
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> DocModelResult<Vec<Document>> {
        let store = self.store.read().await;
        let mut documents = store
            .get(&self.name)
            .map(|state| state.documents.clone())
            .unwrap_or_default();

        for stage in &pipeline {
            let mut entries = stage.iter();
            let (Some((name, spec)), None) = (entries.next(), entries.next()) else {
                return Err(DocModelError::Backend("a pipeline stage must have exactly one field".into()));
            };

            let spec = spec
                .as_document()
                .ok_or_else(|| DocModelError::Backend(format!("the {name} stage takes a document")))?;

            match name.as_str() {
                "$match" => {
                    documents = DocumentEvaluator::filter_documents(&documents, spec)?;
                },
                "$lookup" => {
                    let lookup = LookupSpec::parse(spec)?;
                    let foreign = store
                        .get(&lookup.from)
                        .map(|state| state.documents.as_slice())
                        .unwrap_or_default();

                    for document in documents.iter_mut() {
                        Self::lookup(document, foreign, &lookup)?;
                    }
                },
                other => {
                    return Err(DocModelError::Backend(format!("unrecognized pipeline stage name: '{other}'")));
                },
            }
        }

        Ok(documents)
    }

    async fn create_index(&self, index: IndexSpec) -> DocModelResult<()> {
        let mut store = self.store.write().await;
        let state = store
            .entry(self.name.clone())
            .or_default();

        if let Some(existing) = state.indexes.iter().find(|existing| existing.field == index.field) {
            if *existing == index {
                return Ok(());
            }

            return Err(DocModelError::Backend(format!(
                "index already exists with different options: {}_1",
                index.field,
            )));
        }

        if index.unique {
            for (position, document) in state.documents.iter().enumerate() {
                for earlier in &state.documents[..position] {
                    if let Some(value) = Self::collision(&index, document, earlier) {
                        return Err(self.duplicate_key(&format!("{}_1", index.field), &value));
                    }
                }
            }
        }

        debug!(collection = %self.name, field = %index.field, "Registered index");
        state.indexes.push(index);

        Ok(())
    }
}


/// Builder for [`InMemoryConnection`] instances. Building never fails.
pub struct InMemoryConnectionBuilder {
    database: String,
}

impl InMemoryConnectionBuilder {
    pub fn new(database: &str) -> Self {
        Self { database: database.to_string() }
    }
}

#[async_trait]
impl ConnectionBuilder for InMemoryConnectionBuilder {
    type Backend = InMemoryConnection;

    async fn build(self) -> DocModelResult<Self::Backend> {
        Ok(InMemoryConnection::new(&self.database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn users() -> InMemoryCollection {
        InMemoryConnection::new("test").collection("users")
    }

    #[tokio::test]
    async fn insert_assigns_ids_first() {
        let users = users();
        let id = users.insert_one(doc! { "name": "Ada" }).await.unwrap();
        let stored = users.find_one(doc! {}).await.unwrap().unwrap();

        assert!(matches!(id, Bson::ObjectId(_)));
        assert_eq!(stored.keys().next().map(String::as_str), Some("_id"));
        assert_eq!(stored.get("_id"), Some(&id));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let users = users();
        let id = ObjectId::new();

        users.insert_one(doc! { "_id": id }).await.unwrap();
        let err = users.insert_one(doc! { "_id": id }).await.unwrap_err();

        assert!(err.to_string().contains("E11000"));
    }

    #[tokio::test]
    async fn unique_and_sparse_indexes() {
        let users = users();

        users.create_index(IndexSpec::new("email", true, true)).await.unwrap();
        users.insert_one(doc! { "email": "a@x.io" }).await.unwrap();
        users.insert_one(doc! { "name": "no email" }).await.unwrap();
        users.insert_one(doc! { "name": "still none" }).await.unwrap();

        assert!(users.insert_one(doc! { "email": "a@x.io" }).await.is_err());

        // Two documents already lack "handle", so a non-sparse unique index collides on null.
        assert!(users.create_index(IndexSpec::new("handle", true, false)).await.is_err());
    }

    #[tokio::test]
    async fn unique_index_distinguishes_large_integers() {
        let users = users();
        let big = 2_i64.pow(53);

        users.create_index(IndexSpec::new("k", true, false)).await.unwrap();
        users.insert_one(doc! { "k": (big + 1) }).await.unwrap();
        users.insert_one(doc! { "k": big }).await.unwrap();

        assert!(users.insert_one(doc! { "k": big }).await.is_err());
        assert_eq!(users.find(doc! { "k": big }).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn index_creation_checks_existing_documents() {
        let users = users();

        users.insert_one(doc! { "role": "King" }).await.unwrap();
        users.insert_one(doc! { "role": "King" }).await.unwrap();

        assert!(users.create_index(IndexSpec::new("role", true, false)).await.is_err());
        assert!(users.create_index(IndexSpec::new("role", false, false)).await.is_ok());
        assert!(users.create_index(IndexSpec::new("role", false, false)).await.is_ok());
        assert!(users.create_index(IndexSpec::new("role", false, true)).await.is_err());
    }

    #[tokio::test]
    async fn find_one_and_update_returns_requested_version() {
        let users = users();
        users.insert_one(doc! { "name": "Ada", "visits": 1 }).await.unwrap();

        let before = users
            .find_one_and_update(doc! { "name": "Ada" }, doc! { "$inc": { "visits": 1 } }, ReturnDocument::Before)
            .await
            .unwrap()
            .unwrap();
        let after = users
            .find_one_and_update(doc! { "name": "Ada" }, doc! { "$inc": { "visits": 1 } }, ReturnDocument::After)
            .await
            .unwrap()
            .unwrap();
        let missing = users
            .find_one_and_update(doc! { "name": "Grace" }, doc! { "$inc": { "visits": 1 } }, ReturnDocument::After)
            .await
            .unwrap();

        assert_eq!(before.get("visits"), Some(&Bson::Int32(1)));
        assert_eq!(after.get("visits"), Some(&Bson::Int32(3)));
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn rejected_update_leaves_document_untouched() {
        let users = users();
        users.insert_one(doc! { "name": "Ada" }).await.unwrap();

        let result = users
            .find_one_and_update(doc! {}, doc! { "name": "Grace" }, ReturnDocument::After)
            .await;

        assert!(result.is_err());
        assert!(users.find_one(doc! { "name": "Ada" }).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn lookup_joins_on_local_array() {
        let connection = InMemoryConnection::new("test");
        let quizzes = connection.collection("quizzes");
        let campaigns = connection.collection("campaigns");

        let q1 = quizzes.insert_one(doc! { "title": "one" }).await.unwrap();
        let q2 = quizzes.insert_one(doc! { "title": "two" }).await.unwrap();
        quizzes.insert_one(doc! { "title": "unused" }).await.unwrap();

        campaigns.insert_one(doc! { "name": "spring", "quiz": { "ids": [q1.clone(), q2.clone()] } }).await.unwrap();
        campaigns.insert_one(doc! { "name": "empty", "quiz": { "ids": [] } }).await.unwrap();

        let results = campaigns
            .aggregate(vec![
                doc! { "$match": {} },
                doc! { "$lookup": { "from": "quizzes", "localField": "quiz.ids", "foreignField": "_id", "as": "quiz.data" } },
            ])
            .await
            .unwrap();

        let joined = |i: usize| {
            results[i]
                .get_document("quiz")
                .unwrap()
                .get_array("data")
                .unwrap()
                .len()
        };

        assert_eq!(results.len(), 2);
        assert_eq!(joined(0), 2);
        assert_eq!(joined(1), 0);
    }

    #[tokio::test]
    async fn unsupported_stages_are_rejected() {
        let err = users()
            .aggregate(vec![doc! { "$group": { "_id": null } }])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("$group"));
    }
}

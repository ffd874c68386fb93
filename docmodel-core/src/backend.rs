//! Driver abstraction for the collection wrapper.
//!
//! This module defines the seam between docmodel's typed helpers and the database driver
//! doing the actual work. Backends speak raw BSON [`Document`]s only; encoding and decoding
//! of caller models happens in [`CollectionWrapper`](crate::wrapper::CollectionWrapper).
//!
//! # Traits
//!
//! - [`ConnectionBackend`]: a live client bound to one database
//! - [`CollectionBackend`]: a handle to one named collection in that database
//! - [`ConnectionBuilder`]: factory for connection backends
//!
//! Timeouts are not a backend concern. Every call made through
//! [`Connection`](crate::connection::Connection) or a wrapper is already bounded.

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{config::ReturnDocument, error::DocModelResult};

/// Specification of a single-field ascending index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Field the index is built on.
    pub field: String,
    /// Reject documents that share a value for `field`.
    pub unique: bool,
    /// Skip documents that do not contain `field`.
    pub sparse: bool,
}

impl IndexSpec {
    pub fn new(field: impl Into<String>, unique: bool, sparse: bool) -> Self {
        Self { field: field.into(), unique, sparse }
    }

    /// The key document for this index, e.g. `{ "email": 1 }`.
    pub fn keys(&self) -> Document {
        let mut keys = Document::new();
        keys.insert(self.field.clone(), 1);
        keys
    }
}

/// A live client connected to one database.
///
/// Implementations must be safe to share between tasks; the driver is expected to handle
/// pooling on its own.
#[async_trait]
pub trait ConnectionBackend: Send + Sync + Debug + 'static {
    /// Collection handle type resolved by [`ConnectionBackend::collection`].
    type Collection: CollectionBackend;

    /// Name of the database this connection is bound to.
    fn database_name(&self) -> &str;

    /// Resolves a handle for the named collection. This never touches the network.
    fn collection(&self, name: &str) -> Self::Collection;

    /// Checks that the database answers.
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::Connection`](crate::error::DocModelError::Connection) when it does not.
    async fn ping(&self) -> DocModelResult<()>;
}

/// A handle to one named collection.
///
/// Handles are cheap to clone and hold no per-call state.
#[async_trait]
pub trait CollectionBackend: Clone + Send + Sync + Debug + 'static {
    /// Name of the collection this handle points at.
    fn name(&self) -> &str;

    /// Returns the first document matching `filter`, if any.
    async fn find_one(&self, filter: Document) -> DocModelResult<Option<Document>>;

    /// Atomically applies the update operators in `update` to the first document matching
    /// `filter` and returns that document as selected by `return_document`.
    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        return_document: ReturnDocument,
    ) -> DocModelResult<Option<Document>>;

    /// Inserts one document and returns its `_id`.
    async fn insert_one(&self, document: Document) -> DocModelResult<Bson>;

    /// Returns every document matching `filter`.
    async fn find(&self, filter: Document) -> DocModelResult<Vec<Document>>;

    /// Runs an aggregation pipeline and returns every resulting document.
    async fn aggregate(&self, pipeline: Vec<Document>) -> DocModelResult<Vec<Document>>;

    /// Creates the described index.
    async fn create_index(&self, index: IndexSpec) -> DocModelResult<()>;
}

/// Factory trait for constructing connection backends.
#[async_trait]
pub trait ConnectionBuilder: Send {
    /// The backend type produced by this builder.
    type Backend: ConnectionBackend;

    /// Builds the backend. Implementations may defer network activity to the first request.
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::Initialization`](crate::error::DocModelError::Initialization)
    /// if the client cannot be constructed.
    async fn build(self) -> DocModelResult<Self::Backend>;
}

//! Typed collection wrapper with mongoose-style helpers.
//!
//! A [`CollectionWrapper`] binds one collection handle to one model type and exposes the
//! short-hand operations (`find_one`, `find_one_by_id`, `find_one_and_update`,
//! `find_by_id_and_update`, `new`, `find_many`, `find_many_populate`). Each call runs in
//! its own bounded-duration scope and decodes the result into the bound model.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//!
//! let users = connection.wrap::<User>("users");
//!
//! let king = users.find_one(doc! { "role": "King" }).await?;
//! let renamed = users
//!     .find_by_id_and_update(&king_id, doc! { "$set": { "role": "Queen" } })
//!     .await?;
//! ```

use bson::{Bson, Document, doc};
use std::{fmt, future::Future, marker::PhantomData, time::Duration};
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::{
    backend::CollectionBackend,
    config::{ConnectionConfig, ReturnDocument},
    error::{DocModelError, DocModelResult},
    helpers::to_object_id,
    model::{Model, ModelExt},
    populate::Populate,
};

/// Runs `future` with a fresh deadline of `limit`.
///
/// The deadline is dropped with the future on every exit path.
pub(crate) async fn bounded<T, F>(limit: Duration, future: F) -> DocModelResult<T>
where
    F: Future<Output = DocModelResult<T>>,
{
    timeout(limit, future)
        .await
        .map_err(|_| DocModelError::Timeout(limit))?
}

/// A typed handle over one collection.
///
/// # Type Parameters
///
/// * `C` - The collection handle of the backend in use
/// * `M` - The document shape stored in the collection
///
/// The wrapper holds no per-call state. Clone it freely or share it between tasks.
pub struct CollectionWrapper<C: CollectionBackend, M: Model> {
    handle: C,
    timeout: Duration,
    return_document: ReturnDocument,
    _marker: PhantomData<fn() -> M>,
}

impl<C: CollectionBackend, M: Model> fmt::Debug for CollectionWrapper<C, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionWrapper")
            .field("handle", &self.handle)
            .field("timeout", &self.timeout)
            .field("return_document", &self.return_document)
            .finish()
    }
}

impl<C: CollectionBackend, M: Model> Clone for CollectionWrapper<C, M> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            timeout: self.timeout,
            return_document: self.return_document,
            _marker: PhantomData,
        }
    }
}

impl<C: CollectionBackend, M: Model> CollectionWrapper<C, M> {
    /// Wraps an already resolved collection handle with default settings.
    ///
    /// Prefer [`Connection::wrap`](crate::connection::Connection::wrap), which carries the
    /// connection's configuration over.
    pub fn from_handle(handle: C) -> Self {
        Self::with_config(handle, &ConnectionConfig::default())
    }

    pub(crate) fn with_config(handle: C, config: &ConnectionConfig) -> Self {
        Self {
            handle,
            timeout: config.operation_timeout,
            return_document: config.return_document,
            _marker: PhantomData,
        }
    }

    /// Returns the name of the bound collection.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Returns the raw collection handle for operations this wrapper does not cover.
    pub fn handle(&self) -> &C {
        &self.handle
    }

    /// Returns the per-operation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns a copy of this wrapper using a different per-operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a copy of this wrapper handing back the pre- or post-update document.
    pub fn with_return_document(mut self, return_document: ReturnDocument) -> Self {
        self.return_document = return_document;
        self
    }

    /// Finds the first document matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::DocumentNotFound`] when nothing matches, when the match cannot
    /// be decoded into `M`, or when the lookup itself fails. The cause is only logged.
    pub async fn find_one(&self, query: Document) -> DocModelResult<M> {
        let result = bounded(self.timeout, async {
            match self.handle.find_one(query).await? {
                Some(document) => M::from_document(document),
                None => Err(DocModelError::DocumentNotFound(self.name().to_string())),
            }
        })
        .await;

        result.map_err(|err| {
            debug!(collection = %self.name(), error = %err, "find_one failed");
            DocModelError::DocumentNotFound(self.name().to_string())
        })
    }

    /// Finds the document whose `_id` is the parsed form of `id`.
    ///
    /// A malformed `id` becomes the zero identifier and fails like an unknown one.
    ///
    /// # Errors
    ///
    /// Same as [`CollectionWrapper::find_one`].
    pub async fn find_one_by_id(&self, id: &str) -> DocModelResult<M> {
        self.find_one(doc! { "_id": to_object_id(id) }).await
    }

    /// Applies `update` to the first document matching `filter` and returns it.
    ///
    /// Whether the pre- or post-update version is returned follows the configured
    /// [`ReturnDocument`].
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::UpdateFailed`] when nothing matches, the update is rejected,
    /// or the result cannot be decoded. The cause is logged at `warn`.
    pub async fn find_one_and_update(&self, filter: Document, update: Document) -> DocModelResult<M> {
        let result = bounded(self.timeout, async {
            match self
                .handle
                .find_one_and_update(filter, update, self.return_document)
                .await?
            {
                Some(document) => M::from_document(document),
                None => Err(DocModelError::UpdateFailed(self.name().to_string())),
            }
        })
        .await;

        result.map_err(|err| {
            warn!(collection = %self.name(), error = %err, "find_one_and_update failed");
            DocModelError::UpdateFailed(self.name().to_string())
        })
    }

    /// [`CollectionWrapper::find_one_and_update`] filtered on `_id`.
    pub async fn find_by_id_and_update(&self, id: &str, update: Document) -> DocModelResult<M> {
        self.find_one_and_update(doc! { "_id": to_object_id(id) }, update)
            .await
    }

    /// Inserts `document` and returns the `_id` it was stored under.
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::Serialization`] if `document` cannot be encoded, and the
    /// backend's error, message intact, if the insert is rejected.
    pub async fn new(&self, document: &M) -> DocModelResult<Bson> {
        let document = document.to_document()?;

        debug!(collection = %self.name(), "Inserting document");

        bounded(self.timeout, self.handle.insert_one(document)).await
    }

    /// Returns every document matching `query`. No match yields an empty vector.
    ///
    /// All results are materialized at once; there is no pagination and no cap.
    pub async fn find_many(&self, query: Document) -> DocModelResult<Vec<M>> {
        debug!(collection = %self.name(), %query, "Finding documents");

        bounded(self.timeout, async {
            self.handle
                .find(query)
                .await?
                .into_iter()
                .map(M::from_document)
                .collect::<DocModelResult<Vec<M>>>()
        })
        .await
    }

    /// Returns every document matching `match_query` with one join applied.
    ///
    /// See [`Populate`] for the shape of the attached field. Failures are logged and
    /// returned as-is.
    pub async fn find_many_populate(
        &self,
        match_query: Document,
        populate: &Populate,
    ) -> DocModelResult<Vec<M>> {
        debug!(collection = %self.name(), from = %populate.foreign_model, "Populating documents");

        let result = bounded(self.timeout, async {
            self.handle
                .aggregate(populate.pipeline(match_query))
                .await?
                .into_iter()
                .map(M::from_document)
                .collect::<DocModelResult<Vec<M>>>()
        })
        .await;

        if let Err(err) = &result {
            error!(
                collection = %self.name(),
                from = %populate.foreign_model,
                error = %err,
                "find_many_populate failed"
            );
        }

        result
    }
}

//! Traits for the caller-defined document shapes a wrapper is bound to.
//!
//! docmodel never looks inside a model except through serde. Any type that can be
//! serialized to and deserialized from BSON is a [`Model`] through a blanket
//! implementation, so there is nothing to implement by hand.
//!
//! # Example
//!
//! ```ignore
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//!     pub role: String,
//! }
//! ```

use bson::{
    Document,
    de::deserialize_from_document,
    ser::serialize_to_document,
};
use serde::{Deserialize, Serialize};

use crate::error::DocModelResult;

/// A document shape that can be stored in and read from a collection.
pub trait Model: Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static {}

impl<T> Model for T where T: Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static {}

/// Conversions between a [`Model`] and raw BSON documents.
///
/// Automatically implemented for every [`Model`].
pub trait ModelExt: Model {
    /// Encodes this model as a BSON document.
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::Serialization`](crate::error::DocModelError::Serialization)
    /// if the model does not serialize to a document (e.g. it is a bare scalar).
    fn to_document(&self) -> DocModelResult<Document>;

    /// Decodes a model from a BSON document.
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::Serialization`](crate::error::DocModelError::Serialization)
    /// if the document does not have the model's shape.
    fn from_document(document: Document) -> DocModelResult<Self>;
}

impl<M: Model> ModelExt for M {
    fn to_document(&self) -> DocModelResult<Document> {
        Ok(serialize_to_document(self)?)
    }

    fn from_document(document: Document) -> DocModelResult<Self> {
        Ok(deserialize_from_document(document)?)
    }
}

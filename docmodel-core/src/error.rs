//! Error types and result types for collection operations.
//!
//! Every fallible operation in docmodel returns a [`DocModelResult<T>`]. Single-document
//! reads and updates report the generic [`DocModelError::DocumentNotFound`] and
//! [`DocModelError::UpdateFailed`] variants, while inserts, multi-document reads and
//! aggregations carry the full message of the underlying failure.

use bson::error::Error as BsonError;
use std::time::Duration;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to a database through docmodel.
#[derive(Error, Debug)]
pub enum DocModelError {
    /// The client could not be constructed (bad URI, invalid options).
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The database did not answer the liveness check.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A bounded-duration scope elapsed before the operation completed.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    /// No document matched, or the match could not be decoded.
    /// The argument is the collection name.
    #[error("Cannot find document in collection {0}")]
    DocumentNotFound(String),
    /// No document matched the update filter, or the result could not be decoded.
    /// The argument is the collection name.
    #[error("Cannot update document in collection {0}")]
    UpdateFailed(String),
    /// Encoding or decoding between a model and BSON failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error reported by the underlying driver or backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for docmodel operations.
pub type DocModelResult<T> = Result<T, DocModelError>;

impl From<BsonError> for DocModelError {
    fn from(err: BsonError) -> Self {
        DocModelError::Serialization(err.to_string())
    }
}

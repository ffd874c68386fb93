//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```

pub use docmodel_core::{
    backend::{CollectionBackend, ConnectionBackend, ConnectionBuilder, IndexSpec},
    config::{ConnectionConfig, ReturnDocument},
    connection::Connection,
    error::{DocModelError, DocModelResult},
    helpers::{now, to_object_id, zero_object_id},
    model::{Model, ModelExt},
    populate::Populate,
    wrapper::CollectionWrapper,
};

//! In-memory backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `ConnectionBackend` and
//! `CollectionBackend` traits. It evaluates the filter, update and pipeline documents sent by
//! collection wrappers the way the server would, which makes it suited to development and
//! tests that should not depend on a running database.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Query support** - Implicit equality, comparison, `$in`/`$nin`, `$exists`, `$and`/`$or`/`$nor`, dotted paths
//! - **Update operators** - `$set`, `$unset`, `$inc`, `$push`
//! - **Unique and sparse indexes** - Enforced on insert and update
//! - **Populate** - `$match` and `$lookup` pipeline stages
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryConnection};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Connection::connect(
//!         InMemoryConnection::builder("app"),
//!         ConnectionConfig::default(),
//!     )
//!     .await?;
//!
//!     let users = connection.wrap::<User>("users");
//!     users.new(&User { id: None, name: "Alice".to_string() }).await?;
//!
//!     let alice = users.find_one(doc! { "name": "Alice" }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod store;
pub(crate) mod evaluator;
pub(crate) mod update;

pub use store::{InMemoryCollection, InMemoryConnection, InMemoryConnectionBuilder};

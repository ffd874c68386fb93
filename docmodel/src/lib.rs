//! Main docmodel crate: typed, mongoose-style helpers over a document database.
//!
//! This crate is the primary entry point for users of docmodel. It re-exports the core types
//! from the sub-crates and provides access to the available backends.
//!
//! # Features
//!
//! - **Typed collection wrappers** - Bind a collection to a serde model and get decoded results back
//! - **Short-hand operations** - `find_one`, `find_one_by_id`, `find_one_and_update`, `find_by_id_and_update`, `new`, `find_many`, `find_many_populate`
//! - **Bounded calls** - Every operation runs under a per-connection timeout
//! - **Multiple backends** - MongoDB for production, in-memory for development and tests
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryConnection};
//! use bson::{doc, oid::ObjectId};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//!     pub role: String,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let connection = Connection::connect(
//!         InMemoryConnection::builder("app"),
//!         ConnectionConfig::default(),
//!     )
//!     .await
//!     .unwrap();
//!
//!     connection.create_index("users", "name", true, false).await;
//!
//!     let users = connection.wrap::<User>("users");
//!
//!     let id = users
//!         .new(&User { id: None, name: "Alice".into(), role: "King".into() })
//!         .await
//!         .unwrap();
//!
//!     let alice = users
//!         .find_by_id_and_update(
//!             &id.as_object_id().unwrap().to_hex(),
//!             doc! { "$set": { "role": "Queen" } },
//!         )
//!         .await
//!         .unwrap();
//!
//!     println!("Updated user: {:?}", alice);
//! }
//! ```
//!
//! # Populate
//!
//! ```ignore
//! let populate = Populate::new("quizzes.ids", "quiz_templates", "quizzes.data");
//!
//! let campaigns = connection
//!     .wrap::<Campaign>("campaigns")
//!     .find_many_populate(doc! { "_id": to_object_id(campaign_id) }, &populate)
//!     .await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB driver backend (requires `mongodb` feature)

pub mod prelude;

pub use docmodel_core::{backend, config, connection, error, helpers, model, populate, wrapper};

// Re-export BSON types for convenience
pub use bson;

/// In-memory backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryCollection, InMemoryConnection, InMemoryConnectionBuilder};
}

/// MongoDB backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbCollection, MongoDbConnection, MongoDbConnectionBuilder};
}

//! Typed, mongoose-style collection helpers over a document database driver.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Connection** ([`connection`]) - A health-checked handle on one database, collection resolution and index creation
//! - **Collection wrapper** ([`wrapper`]) - Typed find / update / insert / populate helpers bound to one model
//! - **Backend abstraction** ([`backend`]) - Traits implemented by the concrete drivers
//! - **Models** ([`model`]) - Encoding and decoding caller-defined document shapes
//! - **Populate** ([`populate`]) - Single-stage left-outer lookups
//! - **Helpers** ([`helpers`]) - Identifier parsing and timestamps
//! - **Configuration** ([`config`]) - Per-connection timeouts and update semantics
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
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
//!     pub role: String,
//! }
//!
//! let connection = Connection::connect(InMemoryConnection::builder("app"), ConnectionConfig::default()).await?;
//! let users = connection.wrap::<User>("users");
//!
//! users.new(&User { id: None, role: "King".into() }).await?;
//! let king = users.find_one(doc! { "role": "King" }).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod backend;
pub mod config;
pub mod connection;
pub mod error;
pub mod helpers;
pub mod model;
pub mod populate;
pub mod wrapper;

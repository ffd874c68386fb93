//! MongoDB backend implementation for docmodel.
//!
//! This crate implements the `ConnectionBackend` and `CollectionBackend` traits on top of the
//! official `mongodb` driver. Filters, updates and pipelines are handed to the server
//! verbatim; pooling, retries of the wire protocol and index storage all stay with the driver.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! A connection string and database name are provided through the builder pattern, or read
//! from `MONGODB_URI` / `MONGODB_DATABASE` with [`MongoDbConnectionBuilder::from_env`].
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{prelude::*, mongodb::MongoDbConnection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Connection::connect(
//!         MongoDbConnection::builder("mongodb://localhost:27017", "my_database"),
//!         ConnectionConfig::default(),
//!     )
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

pub mod store;

pub use store::{MongoDbCollection, MongoDbConnection, MongoDbConnectionBuilder};

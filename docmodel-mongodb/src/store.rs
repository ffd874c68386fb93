use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, doc};
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    options::{ClientOptions, IndexOptions, ReturnDocument as MongoReturnDocument},
};
use std::{env, time::Duration};
use tracing::debug;

use docmodel_core::{
    backend::{CollectionBackend, ConnectionBackend, ConnectionBuilder, IndexSpec},
    config::ReturnDocument,
    error::{DocModelError, DocModelResult},
};


fn backend_error(err: mongodb::error::Error) -> DocModelError {
    DocModelError::Backend(err.to_string())
}

fn return_document(value: ReturnDocument) -> MongoReturnDocument {
    match value {
        ReturnDocument::Before => MongoReturnDocument::Before,
        ReturnDocument::After => MongoReturnDocument::After,
    }
}

#[derive(Debug, Clone)]
pub struct MongoDbConnection {
    client: Client,
    database: String,
}

impl MongoDbConnection {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(uri: &str, database: &str) -> MongoDbConnectionBuilder {
        MongoDbConnectionBuilder::new(uri, database)
    }

    /// The driver client, for sessions, transactions and anything else not wrapped here.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

#[async_trait]
impl ConnectionBackend for MongoDbConnection {
    type Collection = MongoDbCollection;

    fn database_name(&self) -> &str {
        &self.database
    }

    fn collection(&self, name: &str) -> MongoDbCollection {
        MongoDbCollection {
            inner: self
                .client
                .database(&self.database)
                .collection::<Document>(name),
        }
    }

    async fn ping(&self) -> DocModelResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocModelError::Connection(e.to_string()))?;

        Ok(())
    }
}

/// A collection handle backed by the driver's `Collection<Document>`.
#[derive(Debug, Clone)]
pub struct MongoDbCollection {
    inner: MongoCollection<Document>,
}

impl MongoDbCollection {
    /// The driver collection, for operations not covered by the wrapper.
    pub fn inner(&self) -> &MongoCollection<Document> {
        &self.inner
    }
}

impl From<MongoCollection<Document>> for MongoDbCollection {
    fn from(inner: MongoCollection<Document>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CollectionBackend for MongoDbCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find_one(&self, filter: Document) -> DocModelResult<Option<Document>> {
        self.inner
            .find_one(filter)
            .await
            .map_err(backend_error)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        return_doc: ReturnDocument,
    ) -> DocModelResult<Option<Document>> {
        self.inner
            .find_one_and_update(filter, update)
            .return_document(return_document(return_doc))
            .await
            .map_err(backend_error)
    }

    async fn insert_one(&self, document: Document) -> DocModelResult<Bson> {
        Ok(
            self.inner
                .insert_one(document)
                .await
                .map_err(backend_error)?
                .inserted_id
        )
    }

    async fn find(&self, filter: Document) -> DocModelResult<Vec<Document>> {
        self.inner
            .find(filter)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> DocModelResult<Vec<Document>> {
        self.inner
            .aggregate(pipeline)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn create_index(&self, index: IndexSpec) -> DocModelResult<()> {
        let created = self.inner
            .create_index(
                IndexModel::builder()
                .keys(index.keys())
                .options(
                    IndexOptions::builder()
                    .unique(index.unique)
                    .sparse(index.sparse)
                    .build()
                )
                .build()
            )
            .await
            .map_err(backend_error)?;

        debug!(collection = %self.inner.name(), index = %created.index_name, "Index created");

        Ok(())
    }
}

/// Builder for [`MongoDbConnection`] instances.
///
/// # Example
///
/// ```ignore
/// let builder = MongoDbConnectionBuilder::new("mongodb://localhost:27017", "app")
///     .app_name("billing")
///     .server_selection_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct MongoDbConnectionBuilder {
    uri: String,
    database: String,
    app_name: Option<String>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
}

impl MongoDbConnectionBuilder {
    pub const URI_VAR: &'static str = "MONGODB_URI";
    pub const DATABASE_VAR: &'static str = "MONGODB_DATABASE";
    pub const DEFAULT_URI: &'static str = "mongodb://localhost:27017";

    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
            app_name: None,
            connect_timeout: None,
            server_selection_timeout: None,
        }
    }

    /// Reads the URI from `MONGODB_URI` (defaulting to a local server) and the database
    /// name from `MONGODB_DATABASE`.
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::Initialization`] if `MONGODB_DATABASE` is not set.
    pub fn from_env() -> DocModelResult<Self> {
        let uri = env::var(Self::URI_VAR)
            .unwrap_or_else(|_| Self::DEFAULT_URI.to_string());
        let database = env::var(Self::DATABASE_VAR)
            .map_err(|_| DocModelError::Initialization(format!("{} is not set", Self::DATABASE_VAR)))?;

        Ok(Self::new(&uri, &database))
    }

    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_string());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ConnectionBuilder for MongoDbConnectionBuilder {
    type Backend = MongoDbConnection;

    async fn build(self) -> DocModelResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| DocModelError::Initialization(e.to_string()))?;

        if self.app_name.is_some() {
            options.app_name = self.app_name;
        }
        if self.connect_timeout.is_some() {
            options.connect_timeout = self.connect_timeout;
        }
        if self.server_selection_timeout.is_some() {
            options.server_selection_timeout = self.server_selection_timeout;
        }

        Ok(MongoDbConnection::new(
            Client::with_options(options)
                .map_err(|e| DocModelError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

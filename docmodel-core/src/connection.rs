//! The connection handle shared by every collection wrapper.
//!
//! A [`Connection`] owns one live backend (client plus selected database) and the
//! [`ConnectionConfig`] applied to everything resolved from it. It replaces a process-wide
//! global: construct it once at startup and pass it, or clones of it, to whoever needs a
//! collection.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{prelude::*, mongodb::MongoDbConnection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let connection = match Connection::connect(
//!         MongoDbConnection::builder("mongodb://localhost:27017", "app"),
//!         ConnectionConfig::default(),
//!     )
//!     .await
//!     {
//!         Ok(connection) => connection,
//!         Err(err) => {
//!             eprintln!("could not connect: {err}");
//!             std::process::exit(1);
//!         }
//!     };
//!
//!     connection.create_index("users", "email", true, false).await;
//!     let users = connection.wrap::<User>("users");
//! }
//! ```

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    backend::{CollectionBackend, ConnectionBackend, ConnectionBuilder, IndexSpec},
    config::ConnectionConfig,
    error::DocModelResult,
    model::Model,
    wrapper::{CollectionWrapper, bounded},
};

/// A live, health-checked connection to one database.
///
/// Cloning is cheap and every clone refers to the same backend.
#[derive(Debug)]
pub struct Connection<B: ConnectionBackend> {
    backend: Arc<B>,
    config: ConnectionConfig,
}

impl<B: ConnectionBackend> Clone for Connection<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
        }
    }
}

impl<B: ConnectionBackend> Connection<B> {
    /// Builds the backend and pings it, both within `config.connect_timeout`.
    ///
    /// The library never aborts the process; a failed startup is handed back to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::Initialization`](crate::error::DocModelError::Initialization) if
    /// the client cannot be built, [`DocModelError::Connection`](crate::error::DocModelError::Connection)
    /// if the ping fails and [`DocModelError::Timeout`](crate::error::DocModelError::Timeout) if
    /// the handshake does not finish in time.
    pub async fn connect<D>(builder: D, config: ConnectionConfig) -> DocModelResult<Self>
    where
        D: ConnectionBuilder<Backend = B>,
    {
        let backend = bounded(config.connect_timeout, async {
            let backend = builder.build().await?;
            backend.ping().await?;
            Ok(backend)
        })
        .await
        .inspect_err(|err| error!(error = %err, "Could not connect to the database"))?;

        info!(database = %backend.database_name(), "Connected to database");

        Ok(Self::new(backend, config))
    }

    /// Wraps a backend that is already connected. No ping is performed.
    pub fn new(backend: B, config: ConnectionConfig) -> Self {
        Self { backend: Arc::new(backend), config }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Name of the selected database.
    pub fn database_name(&self) -> &str {
        self.backend.database_name()
    }

    /// Resolves the handle for the named collection in the selected database.
    pub fn collection(&self, name: &str) -> B::Collection {
        self.backend.collection(name)
    }

    /// Builds a typed wrapper over the named collection using this connection's settings.
    pub fn wrap<M: Model>(&self, name: &str) -> CollectionWrapper<B::Collection, M> {
        CollectionWrapper::with_config(self.collection(name), &self.config)
    }

    /// Creates a single-field ascending index, returning whether it succeeded.
    ///
    /// Failures, including timeouts, are logged and reported as `false`.
    pub async fn create_index(&self, collection: &str, field: &str, unique: bool, sparse: bool) -> bool {
        match self
            .try_create_index(collection, IndexSpec::new(field, unique, sparse))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                error!(collection, field, error = %err, "Could not create index");
                false
            }
        }
    }

    /// Creates the described index, surfacing the cause on failure.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or [`DocModelError::Timeout`](crate::error::DocModelError::Timeout)
    /// after `config.index_timeout`.
    pub async fn try_create_index(&self, collection: &str, index: IndexSpec) -> DocModelResult<()> {
        debug!(collection, field = %index.field, unique = index.unique, sparse = index.sparse, "Creating index");

        let handle = self.collection(collection);

        bounded(self.config.index_timeout, handle.create_index(index)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bson::{Bson, Document};
    use std::time::Duration;
    use tokio::time::sleep;

    use crate::{config::ReturnDocument, error::DocModelError};

    #[derive(Debug, Clone)]
    struct StubCollection {
        name: String,
    }

    #[async_trait]
    impl CollectionBackend for StubCollection {
        fn name(&self) -> &str {
            &self.name
        }

        async fn find_one(&self, _filter: Document) -> DocModelResult<Option<Document>> {
            Ok(None)
        }

        async fn find_one_and_update(
            &self,
            _filter: Document,
            _update: Document,
            _return_document: ReturnDocument,
        ) -> DocModelResult<Option<Document>> {
            Ok(None)
        }

        async fn insert_one(&self, _document: Document) -> DocModelResult<Bson> {
            Ok(Bson::Null)
        }

        async fn find(&self, _filter: Document) -> DocModelResult<Vec<Document>> {
            Ok(vec![])
        }

        async fn aggregate(&self, _pipeline: Vec<Document>) -> DocModelResult<Vec<Document>> {
            Ok(vec![])
        }

        async fn create_index(&self, index: IndexSpec) -> DocModelResult<()> {
            match index.field.as_str() {
                "slow" => {
                    sleep(Duration::from_secs(10)).await;
                    Ok(())
                },
                "rejected" => Err(DocModelError::Backend("index rejected".into())),
                _ => Ok(()),
            }
        }
    }

    #[derive(Debug)]
    struct StubBackend {
        ping: Option<DocModelError>,
        ping_delay: Duration,
    }

    #[async_trait]
    impl ConnectionBackend for StubBackend {
        type Collection = StubCollection;

        fn database_name(&self) -> &str {
            "stub"
        }

        fn collection(&self, name: &str) -> StubCollection {
            StubCollection { name: name.to_string() }
        }

        async fn ping(&self) -> DocModelResult<()> {
            sleep(self.ping_delay).await;

            match &self.ping {
                Some(err) => Err(DocModelError::Connection(err.to_string())),
                None => Ok(()),
            }
        }
    }

    struct StubBuilder {
        fail: bool,
        ping: Option<DocModelError>,
        ping_delay: Duration,
    }

    impl StubBuilder {
        fn healthy() -> Self {
            Self { fail: false, ping: None, ping_delay: Duration::ZERO }
        }
    }

    #[async_trait]
    impl ConnectionBuilder for StubBuilder {
        type Backend = StubBackend;

        async fn build(self) -> DocModelResult<StubBackend> {
            if self.fail {
                return Err(DocModelError::Initialization("bad uri".into()));
            }

            Ok(StubBackend { ping: self.ping, ping_delay: self.ping_delay })
        }
    }

    #[tokio::test]
    async fn connect_succeeds() {
        let connection = Connection::connect(StubBuilder::healthy(), ConnectionConfig::default())
            .await
            .unwrap();

        assert_eq!(connection.database_name(), "stub");
        assert_eq!(connection.collection("users").name(), "users");
        assert_eq!(connection.clone().wrap::<Document>("users").name(), "users");
    }

    #[tokio::test]
    async fn build_failure_is_returned() {
        let builder = StubBuilder { fail: true, ..StubBuilder::healthy() };
        let err = Connection::connect(builder, ConnectionConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DocModelError::Initialization(_)));
    }

    #[tokio::test]
    async fn ping_failure_is_returned() {
        let builder = StubBuilder {
            ping: Some(DocModelError::Backend("no reply".into())),
            ..StubBuilder::healthy()
        };
        let err = Connection::connect(builder, ConnectionConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DocModelError::Connection(_)));
    }

    #[tokio::test]
    async fn slow_handshake_times_out() {
        let builder = StubBuilder { ping_delay: Duration::from_secs(10), ..StubBuilder::healthy() };
        let config = ConnectionConfig::default().with_connect_timeout(Duration::from_millis(20));
        let err = Connection::connect(builder, config).await.unwrap_err();

        assert!(matches!(err, DocModelError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn create_index_reports_success_as_bool() {
        let config = ConnectionConfig::default().with_index_timeout(Duration::from_millis(20));
        let connection = Connection::connect(StubBuilder::healthy(), config)
            .await
            .unwrap();

        assert!(connection.create_index("users", "email", true, false).await);
        assert!(!connection.create_index("users", "rejected", true, true).await);
        assert!(!connection.create_index("users", "slow", false, false).await);
    }

    #[tokio::test]
    async fn wrap_inherits_config() {
        let config = ConnectionConfig::default().with_operation_timeout(Duration::from_secs(2));
        let connection = Connection::new(
            StubBackend { ping: None, ping_delay: Duration::ZERO },
            config,
        );

        assert_eq!(connection.wrap::<Document>("users").timeout(), Duration::from_secs(2));
    }
}

//! Tests against a running server.
//!
//! Run with `MONGODB_URI=mongodb://localhost:27017 cargo test -p docmodel-mongodb -- --ignored`.

use bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use docmodel_core::{
    config::ConnectionConfig,
    connection::Connection,
    error::DocModelError,
    populate::Populate,
};
use docmodel_mongodb::{MongoDbConnection, MongoDbConnectionBuilder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    #[serde(rename = "_id")]
    id: ObjectId,
    role: String,
    #[serde(default)]
    friends: Vec<ObjectId>,
    #[serde(default, skip_serializing)]
    friend_docs: Vec<User>,
}

impl User {
    fn new(role: &str) -> Self {
        Self { id: ObjectId::new(), role: role.to_string(), friends: vec![], friend_docs: vec![] }
    }
}

async fn connect() -> Connection<MongoDbConnection> {
    let uri = std::env::var(MongoDbConnectionBuilder::URI_VAR)
        .unwrap_or_else(|_| MongoDbConnectionBuilder::DEFAULT_URI.to_string());
    let database = format!("docmodel_test_{}", ObjectId::new().to_hex());

    Connection::connect(MongoDbConnection::builder(&uri, &database), ConnectionConfig::default())
        .await
        .expect("a MongoDB server must be reachable")
}

#[tokio::test]
#[ignore = "needs a running MongoDB server"]
async fn wrapper_round_trip() {
    let connection = connect().await;
    let users = connection.wrap::<User>("users");

    let mut king = User::new("King");
    let queen = User::new("Queen");
    king.friends.push(queen.id);

    users.new(&king).await.unwrap();
    users.new(&queen).await.unwrap();

    assert_eq!(users.find_one_by_id(&king.id.to_hex()).await.unwrap().role, "King");
    assert_eq!(users.find_many(doc! { "role": "King" }).await.unwrap().len(), 1);
    assert_eq!(users.find_many(doc! {}).await.unwrap().len(), 2);
    assert!(users.find_many(doc! { "role": "Jester" }).await.unwrap().is_empty());

    let populated = users
        .find_many_populate(doc! { "_id": king.id }, &Populate::new("friends", "users", "friend_docs"))
        .await
        .unwrap();
    assert_eq!(populated[0].friend_docs, vec![queen.clone()]);

    let err = users.find_one_by_id("bogus").await.unwrap_err();
    assert!(matches!(err, DocModelError::DocumentNotFound(_)));

    connection.backend().client().database(connection.database_name()).drop().await.unwrap();
}

#[tokio::test]
#[ignore = "needs a running MongoDB server"]
async fn unique_index_rejects_duplicates() {
    let connection = connect().await;

    assert!(connection.create_index("users", "role", true, false).await);

    let users = connection.wrap::<User>("users");
    users.new(&User::new("King")).await.unwrap();

    let err = users.new(&User::new("King")).await.unwrap_err();
    assert!(matches!(err, DocModelError::Backend(message) if message.contains("E11000")));

    connection.backend().client().database(connection.database_name()).drop().await.unwrap();
}

#[tokio::test]
async fn unreachable_server_fails_to_connect() {
    let builder = MongoDbConnection::builder("mongodb://127.0.0.1:1", "unused")
        .server_selection_timeout(std::time::Duration::from_millis(200));

    let result = Connection::connect(builder, ConnectionConfig::default()).await;

    assert!(matches!(result, Err(DocModelError::Connection(_))));
}

#[tokio::test]
async fn malformed_uri_fails_to_initialize() {
    let result = Connection::connect(
        MongoDbConnection::builder("not-a-uri", "unused"),
        ConnectionConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(DocModelError::Initialization(_))));
}

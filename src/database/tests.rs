use super::auth::{RequestAuthentication, UserIdToken};
use super::query::Direction;
use super::rules::RuleSet;
use super::snapshot::Snapshot;
use super::url_builder::UrlBuilder;
use super::{DatabaseError, FirebaseDatabase};
use crate::core::middleware::JsonSuffix;
use httpmock::Method::{DELETE, GET, PATCH, POST, PUT};
use httpmock::MockServer;
use reqwest::{Client, StatusCode};
use reqwest_middleware::ClientBuilder;
use serde_json::json;

fn emulated(server: &MockServer) -> UrlBuilder {
    UrlBuilder::new("https://test.example.com")
        .unwrap()
        .with_emulator_host(&server.address().to_string())
        .unwrap()
}

fn database(server: &MockServer) -> FirebaseDatabase {
    let client = ClientBuilder::new(Client::new()).with(JsonSuffix).build();
    FirebaseDatabase::with_client(client, emulated(server))
}

fn offline_database() -> FirebaseDatabase {
    let client = ClientBuilder::new(Client::new()).build();
    FirebaseDatabase::with_client(client, UrlBuilder::new("https://test.example.com").unwrap())
}

#[test]
fn test_reference_navigation() {
    let db = offline_database();
    let reference = db.reference("/dinosaurs/stegosaurus/").unwrap();

    assert_eq!(reference.path(), "dinosaurs/stegosaurus");
    assert_eq!(reference.key(), Some("stegosaurus"));
    assert_eq!(reference.uri().as_str(), "https://test.example.com/dinosaurs/stegosaurus");

    let parent = reference.parent().unwrap();
    assert_eq!(parent.path(), "dinosaurs");

    let root = parent.parent().unwrap();
    assert!(root.is_root());
    assert_eq!(root.key(), None);
    assert!(root.parent().is_none());

    let child = root.child("/lambeosaurus/").unwrap();
    assert_eq!(child.path(), "lambeosaurus");
    assert_eq!(reference.child("height").unwrap().path(), "dinosaurs/stegosaurus/height");
}

#[test]
fn test_invalid_paths_are_rejected() {
    let db = offline_database();

    let err = db.reference("dinosaurs/with.dot").unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidArgument(_)));

    let reference = db.reference("dinosaurs").unwrap();
    assert!(matches!(reference.child("a$b"), Err(DatabaseError::InvalidArgument(_))));
}

#[test]
fn test_query_can_only_be_ordered_once() {
    let db = offline_database();
    let query = db.reference("dinosaurs").unwrap().order_by_key().unwrap();

    match query.order_by_value(Direction::Ascending) {
        Err(DatabaseError::UnsupportedQuery(message)) => {
            assert_eq!(message, "This query is already ordered.")
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_query_uri_puts_sorter_before_filters() {
    let db = offline_database();
    let query = db
        .reference("dinosaurs")
        .unwrap()
        .limit_to_first(2)
        .unwrap()
        .order_by_child("height")
        .unwrap()
        .equal_to(3)
        .unwrap();

    assert_eq!(
        query.uri().query(),
        Some("orderBy=%22height%22&limitToFirst=2&equalTo=3")
    );
}

#[tokio::test]
async fn test_get_value() {
    let server = MockServer::start();
    let db = database(&server);

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/dinosaurs/stegosaurus.json")
            .query_param("ns", "test");
        then.status(200).json_body(json!({"height": 4, "length": 9}));
    });

    let value = db
        .reference("dinosaurs/stegosaurus")
        .unwrap()
        .get_value()
        .await
        .unwrap();

    mock.assert();
    assert_eq!(value, json!({"height": 4, "length": 9}));
}

#[tokio::test]
async fn test_get_value_with_etag() {
    let server = MockServer::start();
    let db = database(&server);

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/counter.json")
            .header("X-Firebase-ETag", "true");
        then.status(200).header("ETag", "etag-1").json_body(json!(5));
    });

    let (value, etag) = db.reference("counter").unwrap().get_value_with_etag().await.unwrap();

    mock.assert();
    assert_eq!(value, json!(5));
    assert_eq!(etag, "etag-1");
}

#[tokio::test]
async fn test_get_value_with_etag_without_etag_header() {
    let server = MockServer::start();
    let db = database(&server);

    server.mock(|when, then| {
        when.method(GET).path("/counter.json");
        then.status(200).json_body(json!(5));
    });

    let err = db.reference("counter").unwrap().get_value_with_etag().await.unwrap_err();

    match err {
        DatabaseError::MissingETag(path) => assert_eq!(path, "/counter"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_set_sends_value() {
    let server = MockServer::start();
    let db = database(&server);

    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/users/alice.json")
            .json_body(json!({"name": "Alice"}));
        then.status(200).json_body(json!({"name": "Alice"}));
    });

    db.reference("users/alice")
        .unwrap()
        .set(&json!({"name": "Alice"}))
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_set_null_removes() {
    let server = MockServer::start();
    let db = database(&server);

    let mock = server.mock(|when, then| {
        when.method(DELETE).path("/users/alice.json");
        then.status(200).body("null");
    });

    db.reference("users/alice")
        .unwrap()
        .set(&json!(null))
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_set_with_stale_etag() {
    let server = MockServer::start();
    let db = database(&server);

    let mock = server.mock(|when, then| {
        when.method(PUT).path("/counter.json").header("if-match", "stale");
        then.status(412)
            .json_body(json!({"error": "ETag mismatch"}));
    });

    let err = db
        .reference("counter")
        .unwrap()
        .set_with_etag(&json!(6), "stale")
        .await
        .unwrap_err();

    mock.assert();
    match err {
        DatabaseError::PreconditionFailed(message) => assert_eq!(message, "ETag mismatch"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_push_returns_reference_to_new_child() {
    let server = MockServer::start();
    let db = database(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/messages.json")
            .json_body(json!({"text": "hello"}));
        then.status(200).json_body(json!({"name": "-Nabc123"}));
    });

    let pushed = db
        .reference("messages")
        .unwrap()
        .push(&json!({"text": "hello"}))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(pushed.path(), "messages/-Nabc123");
    assert_eq!(pushed.key(), Some("-Nabc123"));
}

#[tokio::test]
async fn test_update_and_remove() {
    let server = MockServer::start();
    let db = database(&server);

    let update_mock = server.mock(|when, then| {
        when.method(PATCH)
            .path("/users.json")
            .json_body(json!({"alice/age": 31}));
        then.status(200).json_body(json!({"alice/age": 31}));
    });

    let remove_mock = server.mock(|when, then| {
        when.method(DELETE).path("/users/bob.json");
        then.status(200).body("null");
    });

    let users = db.reference("users").unwrap();
    let values = json!({"alice/age": 31}).as_object().unwrap().clone();
    users.update(&values).await.unwrap();
    users.child("bob").unwrap().remove().await.unwrap();

    update_mock.assert();
    remove_mock.assert();
}

#[tokio::test]
async fn test_remove_with_etag() {
    let server = MockServer::start();
    let db = database(&server);

    let mock = server.mock(|when, then| {
        when.method(DELETE).path("/counter.json").header("if-match", "etag-1");
        then.status(200).body("null");
    });

    db.reference("counter")
        .unwrap()
        .remove_with_etag("etag-1")
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_error_statuses() {
    let server = MockServer::start();
    let db = database(&server);

    server.mock(|when, then| {
        when.method(GET).path("/forbidden.json");
        then.status(401).json_body(json!({"error": "Permission denied"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/broken.json");
        then.status(500).body("internal");
    });

    match db.get("forbidden").await.unwrap_err() {
        DatabaseError::PermissionDenied(message) => assert_eq!(message, "Permission denied"),
        other => panic!("unexpected error: {:?}", other),
    }

    match db.get("broken").await.unwrap_err() {
        DatabaseError::Api { status, message } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(message, "internal");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_not_found_suggests_default_rtdb_name() {
    let server = MockServer::start();
    let db = database(&server);

    server.mock(|when, then| {
        when.method(GET).path("/missing.json");
        then.status(404).body("Not Found");
    });

    match db.get("missing").await.unwrap_err() {
        DatabaseError::DatabaseNotFound(message) => assert!(message.contains("-default-rtdb")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_query_sorts_and_limits_returned_value() {
    let server = MockServer::start();
    let db = database(&server);

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/dinosaurs.json")
            .query_param("orderBy", "\"height\"")
            .query_param("limitToFirst", "2");
        then.status(200).json_body(json!({
            "bruhathkayosaurus": {"height": 25},
            "linhenykus": {"height": 0.6},
            "pterodactyl": {"height": 0.9},
        }));
    });

    let value = db
        .reference("dinosaurs")
        .unwrap()
        .order_by_child("height")
        .unwrap()
        .limit_to_first(2)
        .unwrap()
        .get_value()
        .await
        .unwrap();

    mock.assert();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["linhenykus", "pterodactyl"]);
}

#[tokio::test]
async fn test_rejected_query_is_unsupported() {
    let server = MockServer::start();
    let db = database(&server);

    server.mock(|when, then| {
        when.method(GET).path("/dinosaurs.json");
        then.status(400)
            .json_body(json!({"error": "Index not defined, add \".indexOn\": \"height\""}));
    });

    let err = db
        .reference("dinosaurs")
        .unwrap()
        .order_by_child("height")
        .unwrap()
        .get_value()
        .await
        .unwrap_err();

    match err {
        DatabaseError::UnsupportedQuery(message) => assert!(message.contains("Index not defined")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_child_keys() {
    let server = MockServer::start();
    let db = database(&server);

    server.mock(|when, then| {
        when.method(GET).path("/users.json").query_param("shallow", "true");
        then.status(200).json_body(json!({"alice": true, "bob": true}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/counter.json").query_param("shallow", "true");
        then.status(200).json_body(json!(5));
    });

    let keys = db.reference("users").unwrap().child_keys().await.unwrap();
    assert_eq!(keys, ["alice", "bob"]);

    let err = db.reference("counter").unwrap().child_keys().await.unwrap_err();
    assert!(matches!(err, DatabaseError::NoChildren(_)));
}

#[tokio::test]
async fn test_rules() {
    let server = MockServer::start();
    let db = database(&server);

    let get_mock = server.mock(|when, then| {
        when.method(GET).path("/.settings/rules.json");
        then.status(200)
            .json_body(json!({"rules": {".read": true, ".write": false}}));
    });
    let put_mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/.settings/rules.json")
            .json_body(json!({"rules": {".read": false, ".write": false}}));
        then.status(200).json_body(json!({"status": "ok"}));
    });

    let rules = db.get_rules().await.unwrap();
    assert_eq!(rules.rules()["rules"][".read"], json!(true));

    db.update_rules(&RuleSet::private()).await.unwrap();

    get_mock.assert();
    put_mock.assert();
}

#[tokio::test]
async fn test_request_authentication_middleware() {
    let server = MockServer::start();
    let client = ClientBuilder::new(Client::new())
        .with(JsonSuffix)
        .with(RequestAuthentication::new(UserIdToken::new("user-id-token")))
        .build();
    let db = FirebaseDatabase::with_client(client, emulated(&server));

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/private.json")
            .query_param("auth", "user-id-token")
            .query_param("ns", "test");
        then.status(200).json_body(json!("secret"));
    });

    let value = db.get("private").await.unwrap();

    mock.assert();
    assert_eq!(value, json!("secret"));
}

#[test]
fn test_snapshot_navigation() {
    let db = offline_database();
    let reference = db.reference("dinosaurs/stegosaurus").unwrap();
    let snapshot = Snapshot::new(
        reference,
        json!({"height": 4, "appearance": {"plates": 17, "spikes": null}, "tags": ["plates", "tail"]}),
    );

    assert_eq!(snapshot.key(), Some("stegosaurus"));
    assert!(snapshot.exists());
    assert!(snapshot.has_children());
    assert_eq!(snapshot.num_children(), 3);

    assert!(snapshot.has_child("appearance/plates"));
    assert!(snapshot.has_child("/height/"));
    assert!(!snapshot.has_child("appearance/spikes"));
    assert!(!snapshot.has_child("weight"));

    let plates = snapshot.child("appearance/plates").unwrap();
    assert_eq!(plates.key(), Some("plates"));
    assert_eq!(plates.reference().path(), "dinosaurs/stegosaurus/appearance/plates");
    assert_eq!(plates.value(), &json!(17));
    assert!(!plates.has_children());
    assert_eq!(plates.num_children(), 0);

    let weight = snapshot.child("weight").unwrap();
    assert!(!weight.exists());
    assert_eq!(weight.into_value(), json!(null));

    assert_eq!(snapshot.child("tags").unwrap().num_children(), 2);
    assert!(matches!(snapshot.child("a.b"), Err(DatabaseError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_get_snapshot() {
    let server = MockServer::start();
    let db = database(&server);

    server.mock(|when, then| {
        when.method(GET).path("/scores.json").query_param_missing("orderBy");
        then.status(200).json_body(json!({"alice": 3, "bob": 7}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/scores.json")
            .query_param("orderBy", "\"$value\"")
            .query_param("limitToLast", "1");
        then.status(200).json_body(json!({"alice": 3, "bob": 7}));
    });

    let scores = db.reference("scores").unwrap();

    let snapshot = scores.get_snapshot().await.unwrap();
    assert_eq!(snapshot.key(), Some("scores"));
    assert_eq!(snapshot.num_children(), 2);
    assert_eq!(snapshot.child("bob").unwrap().value(), &json!(7));

    let best = scores
        .order_by_value(Direction::Ascending)
        .unwrap()
        .limit_to_last(1)
        .unwrap()
        .get_snapshot()
        .await
        .unwrap();
    assert_eq!(best.reference().path(), "scores");
    assert_eq!(best.value(), &json!({"bob": 7}));
    assert!(!best.has_child("alice"));
}

#[tokio::test]
async fn test_transaction_writes_with_snapshot_etag() {
    let server = MockServer::start();
    let db = database(&server);

    let read = server.mock(|when, then| {
        when.method(GET)
            .path("/counter.json")
            .header("X-Firebase-ETag", "true");
        then.status(200).header("ETag", "etag-1").json_body(json!(5));
    });
    let write = server.mock(|when, then| {
        when.method(PUT)
            .path("/counter.json")
            .header("if-match", "etag-1")
            .json_body(json!(6));
        then.status(200).json_body(json!(6));
    });

    let counter = db.reference("counter").unwrap();

    let written = db
        .run_transaction(|mut transaction| async move {
            let snapshot = transaction.snapshot(&counter).await?;
            let next = snapshot.value().as_i64().unwrap() + 1;
            transaction.set(&counter, &next).await?;
            Ok::<_, DatabaseError>(next)
        })
        .await
        .unwrap();

    read.assert();
    write.assert();
    assert_eq!(written, 6);
}

#[tokio::test]
async fn test_transaction_remove_with_snapshot_etag() {
    let server = MockServer::start();
    let db = database(&server);

    server.mock(|when, then| {
        when.method(GET).path("/sessions/old.json");
        then.status(200).header("ETag", "etag-7").json_body(json!({"active": false}));
    });
    let remove = server.mock(|when, then| {
        when.method(DELETE)
            .path("/sessions/old.json")
            .header("if-match", "etag-7");
        then.status(200).body("null");
    });

    let session = db.reference("sessions/old").unwrap();

    db.run_transaction(|mut transaction| async move {
        transaction.snapshot(&session).await?;
        transaction.remove(&session).await
    })
    .await
    .unwrap();

    remove.assert();
}

#[tokio::test]
async fn test_transaction_requires_snapshot() {
    let server = MockServer::start();
    let db = database(&server);

    let write = server.mock(|when, then| {
        when.method(PUT).path("/counter.json");
        then.status(200).json_body(json!(1));
    });

    let counter = db.reference("counter").unwrap();

    let err = db
        .run_transaction(|transaction| async move { transaction.set(&counter, &1).await })
        .await
        .unwrap_err();

    assert!(matches!(err, DatabaseError::ReferenceHasNotBeenSnapshotted(_)));
    write.assert_calls(0);
}

#[tokio::test]
async fn test_transaction_fails_on_remote_change() {
    let server = MockServer::start();
    let db = database(&server);

    server.mock(|when, then| {
        when.method(GET).path("/counter.json");
        then.status(200).header("ETag", "etag-1").json_body(json!(5));
    });
    server.mock(|when, then| {
        when.method(PUT).path("/counter.json").header("if-match", "etag-1");
        then.status(412).json_body(json!({"error": "ETag mismatch"}));
    });

    let counter = db.reference("counter").unwrap();

    let err = db
        .run_transaction(|mut transaction| async move {
            transaction.snapshot(&counter).await?;
            transaction.set(&counter, &6).await
        })
        .await
        .unwrap_err();

    match &err {
        DatabaseError::TransactionFailed { path, message, source } => {
            assert_eq!(path, "counter");
            assert_eq!(
                message,
                "The reference counter has changed remotely since the transaction has been started."
            );
            assert!(matches!(**source, DatabaseError::PreconditionFailed(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(std::error::Error::source(&err).is_some());
}

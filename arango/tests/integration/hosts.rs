use std::sync::Arc;

use arango::errors::{ConnectionError, RequestError};
use arango::policies::load_balancing::OneRandomPolicy;
use arango::{aql, DatabaseBuilder, LoadBalancingStrategy, QueryOptions};
use assert_matches::assert_matches;
use serde_json::json;

use crate::utils::{database, setup_tracing, FakeArango};

#[tokio::test]
#[ntest::timeout(10000)]
async fn round_robin_hits_every_host_once_per_round() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529", "host2:8529"]);

    for _ in 0..6 {
        db.version().await.unwrap();
    }
    assert_eq!(
        server.hosts(),
        vec!["host0", "host1", "host2", "host0", "host1", "host2"]
    );
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn idempotent_requests_fail_over_to_the_next_host() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529", "host2:8529"]);
    server.take_down("host1");

    for _ in 0..4 {
        db.version().await.unwrap();
    }
    // host1 is tried once, then skipped while healthy hosts remain.
    assert_eq!(
        server.hosts(),
        vec!["host0", "host1", "host2", "host2", "host0"]
    );
    assert!(!db.hosts().hosts()[1].is_healthy());
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn non_idempotent_requests_are_not_retried() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529"]);
    let accounts = db.create_collection("accounts").await.unwrap();
    server.take_down("host1");
    server.clear_requests();

    let err = accounts.save(&json!({ "_key": "a" })).await.unwrap_err();
    assert_matches!(
        err,
        RequestError::Connection(ConnectionError::Transport { ref host, .. })
            if host == "http://host1:8529/"
    );
    assert_eq!(server.hosts(), vec!["host1"]);
    assert!(server.documents("_system", "accounts").is_empty());
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn pinned_cursors_do_not_fail_over() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529"]);

    let mut cursor = db
        .query_with_options(
            aql!("FOR x IN {} RETURN x", json!([1, 2, 3])),
            QueryOptions::new().batch_size(1),
        )
        .await
        .unwrap();
    assert_eq!(cursor.host().url().host_str(), Some("host0"));
    assert_eq!(cursor.next().await.unwrap(), Some(json!(1)));

    server.take_down("host0");
    assert_matches!(cursor.next().await, Err(RequestError::Connection(_)));

    server.bring_up("host0");
    assert_eq!(cursor.all().await.unwrap(), vec![json!(2), json!(3)]);
    assert!(server.hosts()[1..].iter().all(|host| host == "host0"));
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn acquired_endpoints_join_the_rotation() {
    setup_tracing();
    let server = FakeArango::new();
    server.set_endpoints(&["tcp://host0:8529", "tcp://host1:8529", "ssl://host2:8530"]);
    let db = database(&server, &["host0:8529"]);

    let hosts = db.acquire_host_list().await.unwrap();
    assert_eq!(
        hosts
            .urls()
            .iter()
            .map(|url| url.as_str().to_owned())
            .collect::<Vec<_>>(),
        vec!["http://host0:8529/", "http://host1:8529/", "https://host2:8530/"]
    );

    for _ in 0..3 {
        db.version().await.unwrap();
    }
    let mut hosts = server.hosts().split_off(1);
    hosts.sort();
    assert_eq!(hosts, vec!["host0", "host1", "host2"]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn single_servers_have_no_endpoints() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529"]);

    let err = db.acquire_host_list().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(db.hosts().len(), 1);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn replaced_host_lists_keep_pinned_cursors_alive() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529"]);
    db.version().await.unwrap();

    let mut cursor = db
        .query_with_options(
            aql!("FOR x IN {} RETURN x", json!([1, 2, 3])),
            QueryOptions::new().batch_size(1),
        )
        .await
        .unwrap();
    assert_eq!(cursor.host().url().host_str(), Some("host1"));

    db.set_host_list(["host0:8529", "host3:8529"]).unwrap();
    assert_eq!(cursor.all().await.unwrap(), vec![json!(1), json!(2), json!(3)]);

    server.clear_requests();
    db.version().await.unwrap();
    db.version().await.unwrap();
    let mut hosts = server.hosts();
    hosts.sort();
    assert_eq!(hosts, vec!["host0", "host3"]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn strategies() {
    setup_tracing();
    let server = FakeArango::new();

    let single = DatabaseBuilder::new()
        .known_hosts(["host0:8529", "host1:8529"])
        .allow_multiple_hosts_without_balancing(true)
        .transport(Arc::new(server.clone()))
        .build()
        .unwrap();
    for _ in 0..3 {
        single.version().await.unwrap();
    }
    assert_eq!(server.hosts(), vec!["host0"; 3]);

    server.clear_requests();
    let random = DatabaseBuilder::new()
        .known_hosts(["host0:8529", "host1:8529"])
        .load_balancing_policy(Arc::new(OneRandomPolicy::with_fixed_seed(7)))
        .transport(Arc::new(server.clone()))
        .build()
        .unwrap();
    for _ in 0..50 {
        random.version().await.unwrap();
    }
    let hosts = server.hosts();
    assert!(hosts.iter().any(|host| host == "host0"));
    assert!(hosts.iter().any(|host| host == "host1"));

    assert_matches!(
        DatabaseBuilder::new()
            .known_hosts(["host0:8529", "host1:8529"])
            .load_balancing_strategy(LoadBalancingStrategy::None)
            .transport(Arc::new(server.clone()))
            .build(),
        Err(arango::errors::NewDatabaseError::TooManyHosts(2))
    );
}

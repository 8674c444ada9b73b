use arango::client::collection::Collection;
use arango::client::transaction::{TransactionCollections, TransactionOptions};
use arango::network::Method;
use arango::{aql, Database, QueryOptions};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::utils::{database, setup_tracing, FakeArango};

async fn numbers(db: &Database, count: u64) -> Collection {
    let numbers = db.create_collection("numbers").await.unwrap();
    for n in 0..count {
        numbers
            .save(&json!({ "_key": format!("{n:02}"), "n": n }))
            .await
            .unwrap();
    }
    numbers
}

fn cursor_requests(server: &FakeArango) -> Vec<(Method, String, String)> {
    server
        .requests()
        .into_iter()
        .filter(|request| request.url.path().contains("/_api/cursor"))
        .map(|request| {
            (
                request.method.clone(),
                request.url.path().to_owned(),
                request.url.host_str().unwrap().to_owned(),
            )
        })
        .collect()
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn for_each_visits_items_in_order_without_prefetching() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529"]);
    let numbers = numbers(&db, 5).await;

    let mut cursor = db
        .query_with_options(
            aql!("FOR d IN {} RETURN d", &numbers),
            QueryOptions::new().batch_size(2).count(true),
        )
        .await
        .unwrap();
    assert_eq!(cursor.count(), Some(5));
    assert_eq!(cursor_requests(&server).len(), 1);

    let mut seen = Vec::new();
    let visited_all = cursor
        .for_each(|doc| {
            seen.push(doc["n"].as_u64().unwrap());
            true
        })
        .await
        .unwrap();
    assert!(visited_all);
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);

    let requests = cursor_requests(&server);
    let cursor_host = cursor.host().url().host_str().unwrap().to_owned();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].0, Method::POST);
    for (method, path, host) in &requests[1..] {
        assert_eq!(*method, Method::PUT);
        assert_eq!(path, &format!("/_db/_system/_api/cursor/{}", cursor.id().unwrap()));
        assert_eq!(host, &cursor_host);
    }
    assert_eq!(server.open_cursors(), 0);

    // Exhausted cursors stay exhausted.
    assert_eq!(cursor.next().await.unwrap(), None);
    assert_eq!(cursor_requests(&server).len(), 3);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn stopping_early_and_killing() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529"]);
    let numbers = numbers(&db, 5).await;

    let mut cursor = db
        .query_with_options(
            aql!("FOR d IN {} RETURN d", &numbers),
            QueryOptions::new().batch_size(2),
        )
        .await
        .unwrap();

    let visited_all = cursor
        .for_each(|doc| doc["n"].as_u64().unwrap() < 2)
        .await
        .unwrap();
    assert!(!visited_all);
    assert_eq!(cursor_requests(&server).len(), 2);
    assert_eq!(server.open_cursors(), 1);

    cursor.kill().await.unwrap();
    assert_eq!(server.open_cursors(), 0);
    assert!(!cursor.has_next());
    assert_eq!(cursor.next().await.unwrap(), None);

    // Killing again does not reach the server.
    cursor.kill().await.unwrap();
    let requests = cursor_requests(&server);
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].0, Method::DELETE);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn typed_streams() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Number {
        n: u64,
    }

    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529"]);
    let numbers = numbers(&db, 4).await;

    let cursor = db
        .query_with_options(
            aql!("FOR d IN {} RETURN d", &numbers),
            QueryOptions::new().batch_size(3).stream(true).count(true),
        )
        .await
        .unwrap();
    assert_eq!(cursor.count(), None);

    let items: Vec<Number> = cursor.typed::<Number>().into_stream().try_collect().await.unwrap();
    assert_eq!(
        items,
        (0..4).map(|n| Number { n }).collect::<Vec<_>>()
    );
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn bound_arrays_and_extras() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529"]);

    let mut cursor = db
        .query_with_options(
            aql!("FOR x IN {} RETURN x", json!(["a", "b", "c"])),
            QueryOptions::new().batch_size(2),
        )
        .await
        .unwrap();
    assert!(cursor.has_more());
    assert_eq!(cursor.next_batch().await.unwrap(), Some(vec![json!("a"), json!("b")]));
    assert_eq!(cursor.next_batch().await.unwrap(), Some(vec![json!("c")]));
    assert_eq!(cursor.next_batch().await.unwrap(), None);
    assert_eq!(cursor.extra().stats(), Some(&json!({ "scannedFull": 3 })));
    assert!(cursor.extra().warnings().is_empty());

    let query: Value = serde_json::from_slice(
        server.requests()[0].body.as_deref().unwrap(),
    )
    .unwrap();
    assert_eq!(query["query"], json!("FOR x IN @value0 RETURN x"));
    assert_eq!(query["bindVars"], json!({ "value0": ["a", "b", "c"] }));
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn cursors_opened_in_a_step_stay_in_the_transaction() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529"]);
    let numbers = numbers(&db, 0).await;
    let trx = db
        .begin_transaction(
            TransactionCollections::new().write(&numbers),
            TransactionOptions::new(),
        )
        .await
        .unwrap();

    let (db_ref, numbers_ref) = (&db, &numbers);
    let mut cursor = trx
        .step(move || async move {
            for n in 0..3 {
                numbers_ref.save(&json!({ "_key": format!("{n:02}"), "n": n })).await?;
            }
            db_ref
                .query_with_options(
                    aql!("FOR d IN {} RETURN d", numbers_ref),
                    QueryOptions::new().batch_size(1),
                )
                .await
        })
        .await
        .unwrap();

    // Outside of the transaction the staged documents do not exist.
    let mut outside = db.query(aql!("FOR d IN {} RETURN d", &numbers)).await.unwrap();
    assert!(outside.all().await.unwrap().is_empty());

    // Follow-ups of the cursor still belong to the transaction.
    assert_eq!(cursor.all().await.unwrap().len(), 3);
    let follow_ups: Vec<_> = server
        .requests()
        .into_iter()
        .filter(|request| request.method == Method::PUT && request.url.path().contains("/_api/cursor/"))
        .collect();
    assert_eq!(follow_ups.len(), 2);
    for request in &follow_ups {
        assert_eq!(request.header("x-arango-trx-id"), Some(trx.id()));
        assert_eq!(request.url.host(), trx.host().unwrap().url().host());
    }
}

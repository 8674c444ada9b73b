use arango::client::transaction::{
    TransactionCollections, TransactionOptions, TransactionStatus,
};
use arango::errors::RequestError;
use arango::network::Method;
use assert_matches::assert_matches;
use serde_json::json;

use crate::utils::{database, setup_tracing, FakeArango};

#[tokio::test]
#[ntest::timeout(10000)]
async fn aborted_writes_are_invisible_while_direct_writes_survive() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529"]);
    let accounts = db.create_collection("accounts").await.unwrap();

    let trx = db
        .begin_transaction(
            TransactionCollections::new().write(&accounts),
            TransactionOptions::new(),
        )
        .await
        .unwrap();

    let inside = json!({ "_key": "inside" });
    trx.step(|| accounts.save(&inside)).await.unwrap();
    accounts.save(&json!({ "_key": "outside" })).await.unwrap();

    // The transaction reads its own writes, nobody else does.
    assert!(trx.step(|| accounts.document_exists("inside")).await.unwrap());
    assert!(!accounts.document_exists("inside").await.unwrap());

    let state = trx.abort().await.unwrap();
    assert_eq!(state.status, TransactionStatus::Aborted);
    assert_eq!(trx.status(), TransactionStatus::Aborted);

    assert!(!accounts.document_exists("inside").await.unwrap());
    assert!(accounts.document_exists("outside").await.unwrap());
    assert_eq!(
        server.documents("_system", "accounts"),
        vec![json!({ "_key": "outside", "_id": "accounts/outside", "_rev": "_r3" })]
    );
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn committed_writes_become_visible() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529", "host1:8529", "host2:8529"]);
    let accounts = db.create_collection("accounts").await.unwrap();
    let trx = db
        .begin_transaction(
            TransactionCollections::new().write(&accounts),
            TransactionOptions::new().lock_timeout(5).wait_for_sync(true),
        )
        .await
        .unwrap();
    let trx_host = trx.host().unwrap().url().host_str().unwrap().to_owned();

    let alice = json!({ "_key": "alice", "balance": 10 });
    let raise = json!({ "balance": 20 });
    trx.step(|| accounts.save(&alice)).await.unwrap();
    trx.step(|| accounts.update("alice", &raise)).await.unwrap();

    let running = db.list_transactions().await.unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, trx.id());
    assert!(server.documents("_system", "accounts").is_empty());

    trx.commit().await.unwrap();
    assert_eq!(trx.status(), TransactionStatus::Committed);

    let stored = accounts.document("accounts/alice").await.unwrap();
    assert_eq!(stored["balance"], json!(20));
    assert!(db.list_transactions().await.unwrap().is_empty());

    // Every request of the transaction went to the host that began it.
    for request in server
        .requests()
        .iter()
        .filter(|request| request.header("x-arango-trx-id").is_some())
    {
        assert_eq!(request.url.host_str(), Some(trx_host.as_str()));
    }
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn handles_for_one_id_report_the_same_status() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529"]);
    let accounts = db.create_collection("accounts").await.unwrap();

    let trx = db
        .begin_transaction(
            TransactionCollections::new().write(&accounts),
            TransactionOptions::new(),
        )
        .await
        .unwrap();
    let other = db.transaction(trx.id());

    trx.commit().await.unwrap();
    assert_eq!(trx.get().await.unwrap().status, TransactionStatus::Committed);
    assert_eq!(other.get().await.unwrap().status, TransactionStatus::Committed);
    // `get` leaves the cached status alone.
    assert_eq!(other.status(), TransactionStatus::Running);

    let state = other.commit().await.unwrap();
    assert_eq!(state.status, TransactionStatus::Committed);
    assert_eq!(other.status(), TransactionStatus::Committed);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn finished_transactions_refuse_steps_locally() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529"]);
    let accounts = db.create_collection("accounts").await.unwrap();
    let trx = db
        .begin_transaction(
            TransactionCollections::new().write(&accounts),
            TransactionOptions::new(),
        )
        .await
        .unwrap();
    trx.abort().await.unwrap();
    let sent = server.requests().len();

    let doc = json!({ "_key": "late" });
    let result = trx.step(|| accounts.save(&doc)).await;
    assert_matches!(
        result,
        Err(RequestError::TransactionStatus(e)) if e.status() == TransactionStatus::Aborted
    );
    assert_matches!(trx.commit().await, Err(RequestError::TransactionStatus(_)));
    assert_eq!(server.requests().len(), sent);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn spawned_tasks_do_not_join_the_transaction() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529"]);
    let accounts = db.create_collection("accounts").await.unwrap();
    let trx = db
        .begin_transaction(
            TransactionCollections::new().write(&accounts),
            TransactionOptions::new(),
        )
        .await
        .unwrap();

    let detached = accounts.clone();
    trx.step(move || async move {
        tokio::spawn(async move { detached.save(&json!({ "_key": "spawned" })).await })
            .await
            .unwrap()
    })
    .await
    .unwrap();
    trx.abort().await.unwrap();

    assert!(accounts.document_exists("spawned").await.unwrap());
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn javascript_transactions_return_their_result() {
    setup_tracing();
    let server = FakeArango::new();
    let db = database(&server, &["host0:8529"]);
    let accounts = db.collection("accounts");

    let result = db
        .execute_transaction(
            TransactionCollections::new().exclusive(&accounts),
            "function (params) { return params; }",
            Some(json!({ "answer": 42 })),
        )
        .await
        .unwrap();
    assert_eq!(result, json!({ "answer": 42 }));

    let request = server.requests().pop().unwrap();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url.path(), "/_db/_system/_api/transaction");
}

use anyhow::Result;
use arango::client::transaction::{TransactionCollections, TransactionOptions};
use arango::errors::RequestError;
use arango::DatabaseBuilder;
use serde_json::json;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let uri = env::var("ARANGO_URI").unwrap_or_else(|_| "http://127.0.0.1:8529".to_string());

    println!("Connecting to {} ...", uri);

    let db = DatabaseBuilder::new()
        .known_host(uri)
        .user("root", env::var("ARANGO_PASSWORD").unwrap_or_default())
        .build()?;

    let accounts = db.collection("demo_accounts");
    if !accounts.exists().await? {
        accounts.create().await?;
    }
    accounts.truncate().await?;
    accounts.save(&json!({ "_key": "alice", "balance": 100 })).await?;
    accounts.save(&json!({ "_key": "bob", "balance": 0 })).await?;

    let trx = db
        .begin_transaction(
            TransactionCollections::new().write(&accounts),
            TransactionOptions::new().lock_timeout(5),
        )
        .await?;
    println!("Transaction {} is {}", trx.id(), trx.status());

    // Requests issued inside a step belong to the transaction.
    let transfer = &accounts;
    trx.step(move || async move {
        transfer.update("alice", &json!({ "balance": 60 })).await?;
        transfer.update("bob", &json!({ "balance": 40 })).await?;
        Ok::<_, RequestError>(())
    })
    .await?;

    // Not visible outside of the transaction until committed.
    println!("alice outside: {}", accounts.document("alice").await?["balance"]);
    let state = trx.commit().await?;
    println!("Transaction {} is {}", state.id, state.status);
    println!("alice after commit: {}", accounts.document("alice").await?["balance"]);

    // The handle refuses further work without asking the server.
    match trx.step(|| accounts.remove("bob")).await {
        Err(RequestError::TransactionStatus(err)) => println!("{}", err),
        other => println!("Unexpected: {:?}", other),
    }

    Ok(())
}

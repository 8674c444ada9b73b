use anyhow::Result;
use arango::{aql, Database, DatabaseBuilder};
use serde::Deserialize;
use serde_json::json;
use std::env;

#[derive(Debug, Deserialize)]
struct User {
    name: String,
    age: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let uri = env::var("ARANGO_URI").unwrap_or_else(|_| "http://127.0.0.1:8529".to_string());

    println!("Connecting to {} ...", uri);

    let db: Database = DatabaseBuilder::new()
        .known_host(uri)
        .user("root", env::var("ARANGO_PASSWORD").unwrap_or_default())
        .build()?;

    println!("Server: {}", db.version().await?);

    let users = db.collection("demo_users");
    if !users.exists().await? {
        users.create().await?;
    }
    users.truncate().await?;

    users.save(&json!({ "_key": "ann", "name": "Ann", "age": 31 })).await?;
    users.save(&json!({ "_key": "bob", "name": "Bob", "age": 17 })).await?;
    users.save(&json!({ "_key": "cid", "name": "Cid", "age": 45 })).await?;
    users.update("bob", &json!({ "age": 18 })).await?;

    // Every interpolated value becomes a bind variable, collections are
    // bound as collection parameters.
    let min_age = 18;
    let mut cursor = db
        .query(aql!(
            "FOR u IN {} FILTER u.age >= {} SORT u.name RETURN u",
            &users,
            min_age
        ))
        .await?
        .typed::<User>();
    while let Some(user) = cursor.next().await? {
        println!("{} is {}", user.name, user.age);
    }

    println!("bob exists: {}", users.document_exists("bob").await?);
    users.remove("bob").await?;
    println!("bob exists: {}", users.document_exists("bob").await?);

    println!("Ok.");

    Ok(())
}

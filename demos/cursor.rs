use anyhow::Result;
use arango::{aql, join_with, literal, AqlQuery, DatabaseBuilder, QueryOptions};
use futures::TryStreamExt;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let uri = env::var("ARANGO_URI").unwrap_or_else(|_| "http://127.0.0.1:8529".to_string());

    println!("Connecting to {} ...", uri);

    let db = DatabaseBuilder::new()
        .known_host(uri)
        .user("root", env::var("ARANGO_PASSWORD").unwrap_or_default())
        .default_query_options(QueryOptions::new().batch_size(100))
        .build()?;

    // Batches are fetched one at a time, as the stream is consumed.
    let total: u64 = db
        .query_with_options(
            aql!("FOR x IN 1..{} RETURN x", 1000),
            QueryOptions::new().stream(true).ttl(Duration::from_secs(30)),
        )
        .await?
        .typed::<u64>()
        .into_stream()
        .try_fold(0, |acc, x| async move { Ok(acc + x) })
        .await?;
    println!("Sum: {}", total);

    // Fragments compose: nested queries keep their bind variables apart.
    let filters: Vec<AqlQuery> = [3, 5]
        .into_iter()
        .map(|n| aql!("x % {} == 0", n))
        .collect();
    let condition = join_with_or(filters);
    let query = aql!(
        "FOR x IN 1..30 FILTER {} SORT x {} RETURN x",
        condition,
        literal("DESC")
    );
    println!("{}", query.query());

    let mut cursor = db.query_with_options(query, QueryOptions::new().count(true)).await?;
    println!("{:?} results", cursor.count());
    let mut printed = 0;
    cursor
        .for_each(|x| {
            println!("{}", x);
            printed += 1;
            printed < 5
        })
        .await?;
    cursor.kill().await?;

    Ok(())
}

fn join_with_or(fragments: Vec<AqlQuery>) -> AqlQuery {
    let parenthesized: Vec<AqlQuery> = fragments
        .into_iter()
        .map(|fragment| aql!("({})", fragment))
        .collect();
    join_with(parenthesized, " || ")
}

use anyhow::Result;
use arango::{aql, DatabaseBuilder};
use std::env;
use tracing::info;

// To run this example, and view logged messages, RUST_LOG env var needs to be set
// This can be done using shell command presented below
// RUST_LOG=trace cargo run --example logging
#[tokio::main]
async fn main() -> Result<()> {
    // Install global collector configured based on RUST_LOG env var
    // This collector will receive logs from the driver
    tracing_subscriber::fmt::init();

    let uri = env::var("ARANGO_URI").unwrap_or_else(|_| "http://127.0.0.1:8529".to_string());
    info!("Connecting to {}", uri);

    let db = DatabaseBuilder::new()
        .known_host(uri)
        .user("root", env::var("ARANGO_PASSWORD").unwrap_or_default())
        .build()?;

    let mut cursor = db.query(aql!("FOR x IN 1..{} RETURN x", 3)).await?;
    while let Some(x) = cursor.next().await? {
        info!(%x, "Got item");
    }

    Ok(())
}

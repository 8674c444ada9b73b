use anyhow::Result;
use arango::{DatabaseBuilder, LoadBalancingStrategy};
use std::env;
use std::time::Duration;

// Discovers the coordinators of a cluster and spreads requests between them.
// ARANGO_URI may hold several comma-separated coordinator addresses.
#[tokio::main]
async fn main() -> Result<()> {
    let uris = env::var("ARANGO_URI").unwrap_or_else(|_| "http://127.0.0.1:8529".to_string());

    let db = DatabaseBuilder::new()
        .known_hosts(uris.split(',').map(str::trim))
        .load_balancing_strategy(LoadBalancingStrategy::RoundRobin)
        .user("root", env::var("ARANGO_PASSWORD").unwrap_or_default())
        .request_timeout(Some(Duration::from_secs(5)))
        .pool_size(8)
        .build()?;

    match db.acquire_host_list().await {
        Ok(hosts) => println!("Coordinators: {:?}", hosts.urls()),
        Err(err) => println!("Not a cluster? {}", err),
    }

    for _ in 0..db.hosts().len() {
        let response = db.route("/_admin/server/id").get().await;
        match response {
            Ok(response) => println!(
                "{} answered {}",
                response.host().url(),
                response.parsed_body()?
            ),
            Err(err) => println!("Request failed: {}", err),
        }
    }

    for host in db.hosts().hosts() {
        println!("{} healthy: {}", host.url(), host.is_healthy());
    }

    Ok(())
}

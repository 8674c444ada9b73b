//! Async Rust driver for the [ArangoDB](https://arangodb.com) multi-model database.
//!
//! # Driver overview
//! ### Connecting
//! All driver activity revolves around the [Database] handle.\
//! A `Database` is created by specifying a few known hosts and a database name:
//!
//! ```rust,no_run
//! use arango::{Database, DatabaseBuilder, LoadBalancingStrategy};
//! use std::error::Error;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn Error>> {
//!     let db: Database = DatabaseBuilder::new()
//!         .known_host("http://127.0.0.1:8529")
//!         .known_host("http://127.0.0.2:8529")
//!         .load_balancing_strategy(LoadBalancingStrategy::RoundRobin)
//!         .database_name("shop")
//!         .user("root", "")
//!         .build()?;
//!
//!     Ok(())
//! }
//! ```
//! Building does not contact the server, connections are opened lazily by
//! the HTTP transport.
//!
//! ### Making queries
//! Queries are composed with the [aql!] macro. Every interpolated value is
//! sent as a bind variable, and collection handles are bound as collection
//! parameters:
//!
//! ```rust
//! # use arango::Database;
//! # use std::error::Error;
//! # async fn check_only_compiles(db: &Database) -> Result<(), Box<dyn Error>> {
//! use arango::aql;
//!
//! let users = db.collection("users");
//! let mut cursor = db
//!     .query(aql!("FOR u IN {} FILTER u.age > {} RETURN u.name", &users, 18))
//!     .await?;
//!
//! while let Some(name) = cursor.next().await? {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Transactions
//! A [Transaction](client::transaction::Transaction) scopes every request issued inside
//! [`step`](client::transaction::Transaction::step) to the transaction and to
//! the host that started it:
//!
//! ```rust
//! # use arango::Database;
//! # use std::error::Error;
//! # async fn check_only_compiles(db: &Database) -> Result<(), Box<dyn Error>> {
//! use arango::client::transaction::TransactionCollections;
//! use serde_json::json;
//!
//! let accounts = db.collection("accounts");
//! let trx = db
//!     .begin_transaction(TransactionCollections::new().write(&accounts), Default::default())
//!     .await?;
//! let alice = json!({ "_key": "alice", "balance": 10 });
//! trx.step(|| accounts.save(&alice)).await?;
//! trx.commit().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod authentication;
pub mod client;
pub mod errors;
pub mod network;
pub mod policies;


pub use arango_aql as aql_template;
pub use arango_aql::{aql, join, join_with, literal, AqlLiteral, AqlQuery, AqlValue, ToAql};

pub use client::cursor::Cursor;
pub use client::database::Database;
pub use client::database_builder::DatabaseBuilder;
pub use client::query_options::QueryOptions;
pub use client::transaction::Transaction;
pub use policies::load_balancing::LoadBalancingStrategy;

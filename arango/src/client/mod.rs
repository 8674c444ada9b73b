//! This module holds entities that represent the database and its contents:
//! the [Database](database::Database) handle and its builder, collections,
//! views, analyzers, routes, cursors and transactions.

pub mod analyzer;
pub mod collection;
pub mod cursor;
pub mod database;
pub mod database_builder;
pub mod query_options;
pub mod route;
pub mod transaction;
pub mod view;

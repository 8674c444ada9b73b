//! Policies configurable on a [`Database`](crate::Database): load balancing and retries.

pub mod load_balancing;
pub mod retry;

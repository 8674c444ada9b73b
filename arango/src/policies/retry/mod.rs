//! Request retries configurations\
//! To decide when to retry a request the `Database` can use any object which implements
//! the `RetryPolicy` trait.

mod default;
mod fallthrough;
mod retry_policy;

pub use default::{DefaultRetryPolicy, DefaultRetrySession};
pub use fallthrough::{FallthroughRetryPolicy, FallthroughRetrySession};
pub use retry_policy::{RequestInfo, RetryDecision, RetryPolicy, RetrySession};

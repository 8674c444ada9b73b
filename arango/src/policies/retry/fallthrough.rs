use super::{RequestInfo, RetryDecision, RetryPolicy, RetrySession};

/// Retry policy that never fails over.
///
/// A request goes to the first host of its plan only. Connection failures
/// and timeouts are returned to the caller just like server errors, even for
/// idempotent requests, and the failed host is still marked unhealthy for
/// later plans. Useful when the caller runs its own retry loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallthroughRetryPolicy;

/// Session of [`FallthroughRetryPolicy`]. Always answers
/// [`RetryDecision::DontRetry`].
#[derive(Debug)]
pub struct FallthroughRetrySession;

impl FallthroughRetryPolicy {
    pub fn new() -> Self {
        FallthroughRetryPolicy
    }
}

impl RetryPolicy for FallthroughRetryPolicy {
    fn new_session(&self) -> Box<dyn RetrySession> {
        Box::new(FallthroughRetrySession)
    }
}

impl RetrySession for FallthroughRetrySession {
    fn decide_should_retry(&mut self, _request_info: RequestInfo) -> RetryDecision {
        RetryDecision::DontRetry
    }
}

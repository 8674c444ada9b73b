use crate::errors::RequestAttemptError;

/// Information about a failed request attempt.
#[non_exhaustive]
pub struct RequestInfo<'a> {
    /// The error with which the attempt failed
    pub error: &'a RequestAttemptError,
    /// A request is idempotent if it can be applied multiple times without changing the result of the initial application\
    /// Requests with a safe method, or explicitly marked as retryable, are idempotent
    pub is_idempotent: bool,
}

impl<'a> RequestInfo<'a> {
    pub(crate) fn new(error: &'a RequestAttemptError, is_idempotent: bool) -> Self {
        RequestInfo {
            error,
            is_idempotent,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RetryDecision {
    /// Send the request to the same host again.
    RetrySameHost,
    /// Send the request to the next host of the load balancing plan.
    RetryNextHost,
    /// Give up and return the error.
    DontRetry,
}

/// Specifies a policy used to decide when to retry a request
pub trait RetryPolicy: std::fmt::Debug + Send + Sync {
    /// Called for each new request, starts a session of deciding about retries
    fn new_session(&self) -> Box<dyn RetrySession>;
}

/// Used throughout a single request to decide when to retry it
pub trait RetrySession: Send + Sync {
    /// Called after an attempt failed - decide what to do next
    fn decide_should_retry(&mut self, request_info: RequestInfo) -> RetryDecision;
}

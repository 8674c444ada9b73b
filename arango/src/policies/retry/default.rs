use crate::errors::RequestAttemptError;

use super::{RequestInfo, RetryDecision, RetryPolicy, RetrySession};

/// Default retry policy - fails over to the next host once when the request
/// did not get an answer and is safe to send again.
///
/// Answers from the server, error documents and plain HTTP errors alike,
/// are never retried.
#[derive(Debug)]
pub struct DefaultRetryPolicy;

impl DefaultRetryPolicy {
    /// Creates a new instance of [DefaultRetryPolicy].
    pub fn new() -> DefaultRetryPolicy {
        DefaultRetryPolicy
    }
}

impl Default for DefaultRetryPolicy {
    fn default() -> DefaultRetryPolicy {
        DefaultRetryPolicy::new()
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn new_session(&self) -> Box<dyn RetrySession> {
        Box::new(DefaultRetrySession::new())
    }
}

/// Implementation of [RetrySession] for [DefaultRetryPolicy].
pub struct DefaultRetrySession {
    was_connection_retry: bool,
}

impl DefaultRetrySession {
    fn new() -> DefaultRetrySession {
        DefaultRetrySession {
            was_connection_retry: false,
        }
    }
}

impl RetrySession for DefaultRetrySession {
    fn decide_should_retry(&mut self, request_info: RequestInfo) -> RetryDecision {
        match request_info.error {
            // The request may not have reached the server.
            // Try a different host, at most once.
            RequestAttemptError::Connection(_) => {
                if request_info.is_idempotent && !self.was_connection_retry {
                    self.was_connection_retry = true;
                    RetryDecision::RetryNextHost
                } else {
                    RetryDecision::DontRetry
                }
            }
            // The server answered, sending the request again would not help.
            RequestAttemptError::Application(_) | RequestAttemptError::Http(_) => {
                RetryDecision::DontRetry
            }
        }
    }
}

//! This module contains various errors which can be returned by the driver.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use crate::authentication::AuthError;
use crate::client::transaction::TransactionStatus;

/// Error numbers reported by the server in `errorNum`.
pub mod codes {
    /// The requested document does not exist.
    pub const DOCUMENT_NOT_FOUND: u32 = 1202;
    /// The requested collection or view does not exist.
    pub const DATA_SOURCE_NOT_FOUND: u32 = 1203;
    /// A collection or view with this name already exists.
    pub const DUPLICATE_NAME: u32 = 1207;
    /// The cursor does not exist, typically because it was exhausted or expired.
    pub const CURSOR_NOT_FOUND: u32 = 1600;
    /// The transaction does not exist or is no longer running.
    pub const TRANSACTION_NOT_FOUND: u32 = 1655;
}

/// Error that occurred during request execution.
///
/// This is the error surfaced to the user by every operation that talks to
/// the server.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RequestError {
    /// The request could not be delivered, or no response arrived in time.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The server answered with an ArangoDB error document.
    #[error(transparent)]
    Application(#[from] ArangoError),

    /// The server answered with an error status and no ArangoDB error document.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The authenticator failed to produce credentials.
    #[error("Authentication failed: {0}")]
    Authentication(AuthError),

    /// Load balancing policy returned an empty plan.
    #[error("Load balancing policy returned an empty plan, no host to send the request to")]
    EmptyPlan,

    /// Failed to serialize the request body.
    #[error("Failed to serialize request body: {0}")]
    BodySerialization(Arc<serde_json::Error>),

    /// Failed to deserialize a response body.
    #[error("Failed to deserialize response body: {0}")]
    ResponseDeserialization(Arc<serde_json::Error>),

    /// Operation refused locally because the transaction is no longer running.
    #[error(transparent)]
    TransactionStatus(#[from] TransactionStatusError),
}

impl RequestError {
    /// Returns the server error, if this is one.
    pub fn as_arango_error(&self) -> Option<&ArangoError> {
        match self {
            RequestError::Application(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the server reported the given error number.
    pub fn is_error_num(&self, error_num: u32) -> bool {
        self.as_arango_error()
            .is_some_and(|err| err.error_num() == error_num)
    }

    /// Returns the HTTP status of the error response, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Application(err) => Some(err.code()),
            RequestError::Http(err) => Some(err.status()),
            _ => None,
        }
    }
}

impl From<RequestAttemptError> for RequestError {
    fn from(err: RequestAttemptError) -> Self {
        match err {
            RequestAttemptError::Connection(e) => RequestError::Connection(e),
            RequestAttemptError::Application(e) => RequestError::Application(e),
            RequestAttemptError::Http(e) => RequestError::Http(e),
        }
    }
}

/// Error returned from a single attempt of sending a request to one host.
///
/// Retry policies decide on the next step based on this error.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RequestAttemptError {
    /// Transport failure or timeout.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The server answered with an ArangoDB error document.
    #[error(transparent)]
    Application(#[from] ArangoError),

    /// The server answered with an error status and no error document.
    #[error(transparent)]
    Http(#[from] HttpError),
}

/// Connection-level failure of a request.
///
/// Requests that failed this way may not have reached the server, so they
/// are eligible for failover to another host.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ConnectionError {
    /// The transport failed to deliver the request or read the response.
    #[error("Request to {host} failed: {source}")]
    Transport {
        /// Host the request was sent to.
        host: String,
        /// Error reported by the transport.
        source: TransportError,
    },

    /// No response arrived before the request timeout elapsed.
    #[error("Request to {host} timed out after {timeout:?}")]
    Timeout {
        /// Host the request was sent to.
        host: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

/// Error reported by a [`Transport`](crate::network::Transport) implementation.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct TransportError(Arc<dyn StdError + Send + Sync + 'static>);

impl TransportError {
    /// Wraps any error, or an error message, as a transport error.
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        TransportError(Arc::from(err.into()))
    }
}

/// Error document returned by the server.
#[derive(Error, Debug, Clone, PartialEq, Eq, Deserialize)]
#[error("Database returned an error {error_num} (HTTP {code}): {message}")]
pub struct ArangoError {
    code: u16,
    #[serde(rename = "errorNum")]
    error_num: u32,
    #[serde(rename = "errorMessage", default)]
    message: String,
}

impl ArangoError {
    /// Creates an error document by hand, as a server would send it.
    pub fn new(code: u16, error_num: u32, message: impl Into<String>) -> Self {
        ArangoError {
            code,
            error_num,
            message: message.into(),
        }
    }

    /// HTTP status code of the response.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// ArangoDB error number, see [`codes`].
    pub fn error_num(&self) -> u32 {
        self.error_num
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The document or data source does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.error_num,
            codes::DOCUMENT_NOT_FOUND | codes::DATA_SOURCE_NOT_FOUND
        )
    }

    /// The cursor does not exist any more.
    pub fn is_cursor_not_found(&self) -> bool {
        self.error_num == codes::CURSOR_NOT_FOUND
    }

    /// The transaction does not exist or is no longer running.
    pub fn is_transaction_not_found(&self) -> bool {
        self.error_num == codes::TRANSACTION_NOT_FOUND
    }
}

/// Error response that did not carry an ArangoDB error document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Server responded with HTTP {status}: {body}")]
pub struct HttpError {
    status: u16,
    body: String,
}

impl HttpError {
    pub(crate) fn new(status: u16, body: String) -> Self {
        HttpError { status, body }
    }

    /// HTTP status code of the response.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response body, lossily decoded as UTF-8.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Operation on a transaction handle whose cached status is terminal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct TransactionStatusError {
    id: String,
    status: TransactionStatus,
}

impl TransactionStatusError {
    pub(crate) fn new(id: String, status: TransactionStatus) -> Self {
        TransactionStatusError { id, status }
    }

    /// Id of the transaction.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Status the transaction was in.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }
}

impl fmt::Display for TransactionStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction {} is already {}, it cannot be used any more",
            self.id, self.status
        )
    }
}

/// Error that occurred while building a [`Database`](crate::Database).
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum NewDatabaseError {
    /// List of known hosts passed to the builder is empty.
    /// There needs to be at least one host to send requests to.
    #[error("Empty known hosts list")]
    EmptyKnownHostsList,

    /// One of the known hosts is not a valid HTTP(S) URL.
    #[error("Invalid host URL {url}: {reason}")]
    InvalidHostUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// More than one host was given without a load balancing strategy.
    #[error(
        "{0} hosts were given but load balancing is disabled; \
        choose a load balancing strategy or allow multiple hosts without balancing"
    )]
    TooManyHosts(usize),

    /// The default HTTP transport could not be initialized.
    #[error("Failed to initialize HTTP transport: {0}")]
    Transport(TransportError),
}

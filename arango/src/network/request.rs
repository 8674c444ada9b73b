use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::host::HostRef;
use super::transport::{HttpRequest, HttpResponse, Method};
use crate::errors::{ArangoError, HttpError, RequestAttemptError, RequestError};

pub(crate) const TRANSACTION_ID_HEADER: &str = "x-arango-trx-id";
pub(crate) const DIRTY_READ_HEADER: &str = "x-arango-allow-dirty-read";

/// A logical request to the server.
///
/// This is what the entity wrappers hand to the connection layer through
/// [`Database::request`](crate::Database::request). The path is relative to
/// the database the request is sent through.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Bytes>,
    pub(crate) transaction_id: Option<String>,
    pub(crate) host: Option<HostRef>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) retryable: Option<bool>,
    pub(crate) detached: bool,
}

impl Request {
    /// Creates a request without body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            query: Vec::new(),
            body: None,
            transaction_id: None,
            host: None,
            timeout: None,
            retryable: None,
            detached: false,
        }
    }

    /// Adds a header. Names are case-insensitive.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Adds a query string parameter.
    pub fn query_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `body` as the JSON body of the request.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, RequestError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| RequestError::BodySerialization(err.into()))?;
        self.body = Some(bytes.into());
        Ok(self.header("content-type", "application/json"))
    }

    /// Sends the request through the given transaction.
    pub fn transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    /// Pins the request to a host. Pinned requests skip load balancing
    /// and are never retried.
    pub fn pinned_to(mut self, host: HostRef) -> Self {
        self.host = Some(host);
        self
    }

    /// Overrides the database-wide request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Marks the request as safe (or unsafe) to send again after a
    /// connection failure, regardless of its method.
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// HTTP method of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path of the request.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` if sending the request twice has the same effect as sending it once.
    ///
    /// An explicit [`retryable`](Request::retryable) flag takes precedence over the method.
    pub fn is_idempotent(&self) -> bool {
        self.retryable.unwrap_or_else(|| {
            matches!(
                self.method,
                Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
            )
        })
    }

    /// Keeps the request out of any transaction step it is sent from.
    pub(crate) fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    pub(crate) fn with_path_prefix(mut self, prefix: &str) -> Self {
        let path = self.path.trim_start_matches('/');
        self.path = if path.is_empty() {
            prefix.to_owned()
        } else {
            format!("{prefix}/{path}")
        };
        self
    }

    pub(crate) fn to_http(&self, base: &Url, authorization: Option<&str>) -> HttpRequest {
        let mut url = base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(self.path.split('/').filter(|segment| !segment.is_empty()));
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        let mut headers = self.headers.clone();
        if let Some(id) = &self.transaction_id {
            headers.insert(TRANSACTION_ID_HEADER.to_owned(), id.clone());
        }
        if let Some(authorization) = authorization {
            headers.insert("authorization".to_owned(), authorization.to_owned());
        }

        HttpRequest {
            method: self.method.clone(),
            url,
            headers,
            body: self.body.clone(),
        }
    }
}

/// A successful response, together with the host that produced it.
#[derive(Clone, Debug)]
pub struct Response {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Bytes,
    host: HostRef,
}

impl Response {
    /// Turns a raw response into either a `Response` or the error it carries.
    pub(crate) fn from_http(
        response: HttpResponse,
        host: HostRef,
    ) -> Result<Self, RequestAttemptError> {
        if response.status >= 400 {
            return Err(match serde_json::from_slice::<ArangoError>(&response.body) {
                Ok(err) => err.into(),
                Err(_) => HttpError::new(
                    response.status,
                    String::from_utf8_lossy(&response.body).into_owned(),
                )
                .into(),
            });
        }

        Ok(Response {
            status: response.status,
            headers: response.headers,
            body: response.body,
            host,
        })
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers. Names are lower case.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Raw response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The host that answered. Use it to pin follow-up requests.
    pub fn host(&self) -> &HostRef {
        &self.host
    }

    /// Deserializes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        serde_json::from_slice(&self.body)
            .map_err(|err| RequestError::ResponseDeserialization(err.into()))
    }

    /// Parses the body as JSON, or returns `Null` for an empty body.
    pub fn parsed_body(&self) -> Result<serde_json::Value, RequestError> {
        if self.body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        self.json()
    }
}

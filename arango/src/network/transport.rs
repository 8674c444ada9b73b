use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

pub use reqwest::Method;

use crate::errors::TransportError;

/// A fully resolved HTTP request, ready to be sent to one host.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, including the query string.
    pub url: Url,
    /// Header names are lower case.
    pub headers: BTreeMap<String, String>,
    /// Request body, if any.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Returns the value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Raw HTTP response as returned by a [`Transport`].
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Header names are lower case.
    pub headers: BTreeMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates a response with the given status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        HttpResponse {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        HttpResponse::new(status, body.to_string()).with_header("content-type", "application/json")
    }

    /// Adds a header to the response.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

/// Sends HTTP requests on behalf of the driver.
///
/// Socket management, keep-alive and TLS belong to the implementation.
/// The driver calls [`send`](Transport::send) once per attempt, under its own
/// timeout, and treats an `Err` as a connection-level failure.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Sends the request and waits for the full response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// The default [`Transport`], backed by a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(TransportError::new)?;
        Ok(ReqwestTransport { client })
    }

    /// Creates a transport that sends requests through the given client.
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(TransportError::new)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_owned(), value.to_owned()))
            })
            .collect();
        let body = response.bytes().await.map_err(TransportError::new)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

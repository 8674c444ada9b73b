//! Arbitrary HTTP endpoints of a database, such as Foxx services.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::client::database::Database;
use crate::errors::RequestError;
use crate::network::{Method, Request, Response};

/// Handle of a path relative to a database.
///
/// Headers given when creating the route are sent with every request.
#[derive(Clone)]
pub struct Route {
    db: Database,
    path: String,
    headers: BTreeMap<String, String>,
}

fn join_paths(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    match (base.trim_end_matches('/'), path) {
        (base, "") => base.to_owned(),
        (base, path) => format!("{base}/{path}"),
    }
}

impl Route {
    pub(crate) fn new(db: Database, path: &str, headers: BTreeMap<String, String>) -> Self {
        let path = join_paths("", path);
        Route {
            db,
            path,
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
        }
    }

    /// Path of the route, relative to the database.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Creates a route for a sub-path, inheriting the headers.
    pub fn route(&self, path: &str) -> Route {
        Route {
            db: self.db.clone(),
            path: join_paths(&self.path, path),
            headers: self.headers.clone(),
        }
    }

    /// Creates a request to a sub-path of the route, with the route headers.
    pub fn request(&self, method: Method, path: &str) -> Request {
        self.headers.iter().fold(
            Request::new(method, join_paths(&self.path, path)),
            |request, (name, value)| request.header(name, value.clone()),
        )
    }

    /// Sends a request built with [`Route::request`].
    pub async fn send(&self, request: Request) -> Result<Response, RequestError> {
        self.db.request(request).await
    }

    /// `GET` on the route.
    pub async fn get(&self) -> Result<Response, RequestError> {
        self.send(self.request(Method::GET, "")).await
    }

    /// `GET` on the route with query string parameters.
    pub async fn get_with_query<K, V>(&self, query: &[(K, V)]) -> Result<Response, RequestError>
    where
        K: AsRef<str>,
        V: ToString,
    {
        let request = query
            .iter()
            .fold(self.request(Method::GET, ""), |request, (name, value)| {
                request.query_param(name.as_ref(), value.to_string())
            });
        self.send(request).await
    }

    /// `POST` with a JSON body.
    pub async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<Response, RequestError> {
        self.send(self.request(Method::POST, "").json(body)?).await
    }

    /// `PUT` with a JSON body.
    pub async fn put<T: Serialize + ?Sized>(&self, body: &T) -> Result<Response, RequestError> {
        self.send(self.request(Method::PUT, "").json(body)?).await
    }

    /// `PATCH` with a JSON body.
    pub async fn patch<T: Serialize + ?Sized>(&self, body: &T) -> Result<Response, RequestError> {
        self.send(self.request(Method::PATCH, "").json(body)?).await
    }

    /// `DELETE` on the route.
    pub async fn delete(&self) -> Result<Response, RequestError> {
        self.send(self.request(Method::DELETE, "")).await
    }

    /// `HEAD` on the route.
    pub async fn head(&self) -> Result<Response, RequestError> {
        self.send(self.request(Method::HEAD, "")).await
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("database", &self.db.name())
            .field("path", &self.path)
            .field("headers", &self.headers)
            .finish()
    }
}

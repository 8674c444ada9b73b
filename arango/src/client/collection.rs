//! Collection handles.

use std::fmt;

use arango_aql::{AqlValue, AsNamedReference, NamedReference};
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::database::Database;
use crate::errors::RequestError;
use crate::network::{Method, Request};

/// Handle of a document collection.
///
/// Creating a handle does not contact the server. Interpolating the handle
/// into an [`aql!`](crate::aql) query binds it as a collection parameter.
#[derive(Clone)]
pub struct Collection {
    db: Database,
    reference: NamedReference,
}

impl Collection {
    pub(crate) fn new(db: Database, name: &str) -> Self {
        Collection {
            db,
            reference: NamedReference::collection(name),
        }
    }

    /// Name of the collection.
    pub fn name(&self) -> &str {
        self.reference.name()
    }

    fn path(&self) -> String {
        format!("/_api/collection/{}", self.name())
    }

    fn document_path(&self, selector: &str) -> String {
        match selector.split_once('/') {
            Some((_, key)) => format!("/_api/document/{}/{}", self.name(), key),
            None => format!("/_api/document/{}/{}", self.name(), selector),
        }
    }

    /// Creates the collection on the server.
    pub async fn create(&self) -> Result<Value, RequestError> {
        let request =
            Request::new(Method::POST, "/_api/collection").json(&json!({ "name": self.name() }))?;
        self.db.request(request).await?.parsed_body()
    }

    /// Returns basic information about the collection.
    pub async fn get(&self) -> Result<Value, RequestError> {
        self.db
            .request(Request::new(Method::GET, self.path()))
            .await?
            .parsed_body()
    }

    /// Returns `true` if the collection exists.
    pub async fn exists(&self) -> Result<bool, RequestError> {
        match self.get().await {
            Ok(_) => Ok(true),
            Err(RequestError::Application(err)) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Returns the properties of the collection, such as `waitForSync`.
    pub async fn properties(&self) -> Result<Value, RequestError> {
        self.metadata("properties").await
    }

    /// Returns information about the collection with its document count.
    pub async fn count(&self) -> Result<Value, RequestError> {
        self.metadata("count").await
    }

    /// Returns information about the collection with its revision id.
    pub async fn revision(&self) -> Result<Value, RequestError> {
        self.metadata("revision").await
    }

    async fn metadata(&self, kind: &str) -> Result<Value, RequestError> {
        self.db
            .request(Request::new(Method::GET, format!("{}/{kind}", self.path())))
            .await?
            .parsed_body()
    }

    /// Stores a new document and returns its metadata (`_id`, `_key`, `_rev`).
    pub async fn save<T: Serialize + ?Sized>(&self, document: &T) -> Result<Value, RequestError> {
        let request = Request::new(Method::POST, format!("/_api/document/{}", self.name()))
            .json(document)?;
        self.db.request(request).await?.parsed_body()
    }

    /// Returns the document with the given key or `collection/key` id.
    pub async fn document(&self, selector: &str) -> Result<Value, RequestError> {
        self.db
            .request(Request::new(Method::GET, self.document_path(selector)))
            .await?
            .parsed_body()
    }

    /// Returns `true` if the document exists.
    pub async fn document_exists(&self, selector: &str) -> Result<bool, RequestError> {
        match self
            .db
            .request(Request::new(Method::HEAD, self.document_path(selector)))
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.status() == Some(404) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Partially updates a document and returns its new metadata.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        selector: &str,
        patch: &T,
    ) -> Result<Value, RequestError> {
        let request = Request::new(Method::PATCH, self.document_path(selector)).json(patch)?;
        self.db.request(request).await?.parsed_body()
    }

    /// Removes a document and returns its last metadata.
    pub async fn remove(&self, selector: &str) -> Result<Value, RequestError> {
        self.db
            .request(Request::new(Method::DELETE, self.document_path(selector)))
            .await?
            .parsed_body()
    }

    /// Removes all documents of the collection.
    pub async fn truncate(&self) -> Result<Value, RequestError> {
        self.db
            .request(Request::new(Method::PUT, format!("{}/truncate", self.path())))
            .await?
            .parsed_body()
    }

    /// Deletes the collection.
    pub async fn drop(&self) -> Result<Value, RequestError> {
        self.db
            .request(Request::new(Method::DELETE, self.path()))
            .await?
            .parsed_body()
    }
}

impl AsNamedReference for Collection {
    fn named_reference(&self) -> &NamedReference {
        &self.reference
    }
}

impl From<&Collection> for AqlValue {
    fn from(collection: &Collection) -> Self {
        AqlValue::reference(collection)
    }
}

impl From<Collection> for AqlValue {
    fn from(collection: Collection) -> Self {
        AqlValue::Reference(collection.reference)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("database", &self.db.name())
            .field("name", &self.name())
            .finish()
    }
}

//! View handles.

use std::fmt;

use arango_aql::{AqlValue, AsNamedReference, NamedReference};
use serde_json::Value;

use crate::client::database::Database;
use crate::errors::RequestError;
use crate::network::{Method, Request};

/// Handle of an ArangoSearch or search-alias view.
///
/// Interpolating the handle into an [`aql!`](crate::aql) query binds it as
/// a collection parameter, the same way collections are bound.
#[derive(Clone)]
pub struct View {
    db: Database,
    reference: NamedReference,
}

impl View {
    pub(crate) fn new(db: Database, name: &str) -> Self {
        View {
            db,
            reference: NamedReference::view(name),
        }
    }

    /// Name of the view.
    pub fn name(&self) -> &str {
        self.reference.name()
    }

    fn path(&self) -> String {
        format!("/_api/view/{}", self.name())
    }

    /// Returns the description of the view.
    pub async fn get(&self) -> Result<Value, RequestError> {
        self.db
            .request(Request::new(Method::GET, self.path()))
            .await?
            .parsed_body()
    }

    /// Deletes the view.
    pub async fn drop(&self) -> Result<Value, RequestError> {
        self.db
            .request(Request::new(Method::DELETE, self.path()))
            .await?
            .parsed_body()
    }
}

impl AsNamedReference for View {
    fn named_reference(&self) -> &NamedReference {
        &self.reference
    }
}

impl From<&View> for AqlValue {
    fn from(view: &View) -> Self {
        AqlValue::reference(view)
    }
}

impl From<View> for AqlValue {
    fn from(view: View) -> Self {
        AqlValue::Reference(view.reference)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("database", &self.db.name())
            .field("name", &self.name())
            .finish()
    }
}

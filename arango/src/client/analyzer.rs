//! Analyzer handles.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::database::Database;
use crate::errors::RequestError;
use crate::network::{Method, Request};

/// Handle of an ArangoSearch analyzer.
///
/// Analyzers listed by the server carry their database-qualified name
/// (`database::name`); handles created with [`Database::analyzer`] keep the
/// name they were given. The server accepts both forms.
#[derive(Clone)]
pub struct Analyzer {
    db: Database,
    name: String,
}

#[derive(Serialize)]
struct CreateAnalyzerBody<'a, T: ?Sized> {
    name: &'a str,
    #[serde(flatten)]
    options: &'a T,
}

#[derive(Deserialize)]
pub(crate) struct AnalyzerListBody {
    pub(crate) result: Vec<Value>,
}

impl Analyzer {
    pub(crate) fn new(db: Database, name: &str) -> Self {
        Analyzer {
            db,
            name: name.to_owned(),
        }
    }

    /// Name of the analyzer.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> String {
        format!("/_api/analyzer/{}", self.name)
    }

    /// Returns the definition of the analyzer.
    pub async fn get(&self) -> Result<Value, RequestError> {
        self.db
            .request(Request::new(Method::GET, self.path()))
            .await?
            .parsed_body()
    }

    /// Returns `true` if the analyzer exists.
    pub async fn exists(&self) -> Result<bool, RequestError> {
        match self.get().await {
            Ok(_) => Ok(true),
            Err(RequestError::Application(err)) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Creates the analyzer.
    ///
    /// `options` must serialize to a JSON object, e.g.
    /// `json!({ "type": "identity" })`. The name of the handle is added to it.
    pub async fn create<T: Serialize + ?Sized>(&self, options: &T) -> Result<Value, RequestError> {
        let body = CreateAnalyzerBody {
            name: &self.name,
            options,
        };
        let request = Request::new(Method::POST, "/_api/analyzer").json(&body)?;
        self.db.request(request).await?.parsed_body()
    }

    /// Deletes the analyzer. With `force`, views still using it do not
    /// prevent the deletion.
    pub async fn drop(&self, force: bool) -> Result<Value, RequestError> {
        let mut request = Request::new(Method::DELETE, self.path());
        if force {
            request = request.query_param("force", true);
        }
        self.db.request(request).await?.parsed_body()
    }
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("database", &self.db.name())
            .field("name", &self.name)
            .finish()
    }
}

//! `Database` is the main object used in the driver.\
//! It manages the host list, balances requests between hosts and runs queries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arango_aql::AqlQuery;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};
use url::Url;

use crate::authentication::AuthenticatorProvider;
use crate::client::analyzer::{Analyzer, AnalyzerListBody};
use crate::client::collection::Collection;
use crate::client::cursor::{Cursor, CursorConfig};
use crate::client::query_options::{CursorRequestBody, QueryOptions};
use crate::client::route::Route;
use crate::client::transaction::{
    BeginTransactionBody, Transaction, TransactionCollections, TransactionInfo,
    TransactionOptions, TransactionScope, TransactionStateBody, TransactionStatus,
};
use crate::client::view::View;
use crate::errors::{NewDatabaseError, RequestError};
use crate::network::{
    parse_host_url, Connection, ConnectionConfig, HostList, Method, ReqwestTransport, Request,
    Response, Transport, DIRTY_READ_HEADER,
};
use crate::policies::load_balancing::{LoadBalancingPolicy, LoadBalancingStrategy};
use crate::policies::retry::{DefaultRetryPolicy, RetryPolicy};

pub(crate) mod defaults {
    use std::time::Duration;

    pub(crate) const DATABASE_NAME: &str = "_system";
    pub(crate) const REQUEST_TIMEOUT: Option<Duration> = Some(Duration::from_secs(60));
    pub(crate) const POOL_SIZE: usize = 3;
}

/// Configuration options for [`Database`].
/// Can be created manually, but usually it's easier to use
/// [DatabaseBuilder](super::database_builder::DatabaseBuilder)
#[derive(Clone)]
#[non_exhaustive]
pub struct DatabaseConfig {
    /// List of host addresses the database starts with.
    /// Accepts `http://`, `https://`, `tcp://` and `ssl://` URLs, and
    /// bare `host:port` addresses (plain HTTP).
    pub known_hosts: Vec<String>,

    /// Name of the database the handle works on.
    pub database_name: String,

    /// How requests are spread between hosts.
    pub load_balancing_strategy: LoadBalancingStrategy,

    /// Custom load balancing policy. Takes precedence over
    /// [`load_balancing_strategy`](DatabaseConfig::load_balancing_strategy).
    pub load_balancing_policy: Option<Arc<dyn LoadBalancingPolicy>>,

    /// Allows more than one known host with [`LoadBalancingStrategy::None`].
    /// All requests then go to the first host.
    pub allow_multiple_hosts_without_balancing: bool,

    /// Decides whether failed requests are sent again.
    pub retry_policy: Arc<dyn RetryPolicy>,

    /// Provides the `Authorization` header of every request.
    pub authenticator: Option<Arc<dyn AuthenticatorProvider>>,

    /// Default client-side timeout of a request. `None` disables it.
    pub request_timeout: Option<Duration>,

    /// Number of requests a single host may have in flight.
    pub pool_size: usize,

    /// Options applied to every query unless overridden.
    pub default_query_options: QueryOptions,

    /// HTTP transport. [`ReqwestTransport`] is used when not set.
    pub transport: Option<Arc<dyn Transport>>,
}

impl DatabaseConfig {
    /// Creates a [`DatabaseConfig`] with default configuration
    /// # Default configuration
    /// * database name: `_system`
    /// * no load balancing, a single host
    /// * request timeout: 60 seconds
    /// * pool size: 3 requests per host
    pub fn new() -> Self {
        DatabaseConfig {
            known_hosts: Vec::new(),
            database_name: defaults::DATABASE_NAME.to_owned(),
            load_balancing_strategy: LoadBalancingStrategy::default(),
            load_balancing_policy: None,
            allow_multiple_hosts_without_balancing: false,
            retry_policy: Arc::new(DefaultRetryPolicy::new()),
            authenticator: None,
            request_timeout: defaults::REQUEST_TIMEOUT,
            pool_size: defaults::POOL_SIZE,
            default_query_options: QueryOptions::default(),
            transport: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("known_hosts", &self.known_hosts)
            .field("database_name", &self.database_name)
            .field("load_balancing_strategy", &self.load_balancing_strategy)
            .field(
                "load_balancing_policy",
                &self.load_balancing_policy.as_ref().map(|policy| policy.name()),
            )
            .field(
                "allow_multiple_hosts_without_balancing",
                &self.allow_multiple_hosts_without_balancing,
            )
            .field("retry_policy", &self.retry_policy)
            .field("authenticator", &self.authenticator.is_some())
            .field("request_timeout", &self.request_timeout)
            .field("pool_size", &self.pool_size)
            .field("default_query_options", &self.default_query_options)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Handle of an ArangoDB database.
///
/// Cloning is cheap, clones and handles returned by [`Database::database`]
/// share the connection: the host list, the load balancing state and the
/// per-host request pools.
#[derive(Clone)]
pub struct Database {
    name: Arc<str>,
    connection: Arc<Connection>,
    default_query_options: Arc<QueryOptions>,
}

#[derive(Deserialize)]
struct EndpointsBody {
    endpoints: Vec<Endpoint>,
}

#[derive(Deserialize)]
struct Endpoint {
    endpoint: String,
}

#[derive(Deserialize)]
struct TransactionListBody {
    transactions: Vec<TransactionInfo>,
}

#[derive(Deserialize)]
struct ResultBody {
    #[serde(default)]
    result: Value,
}

impl Database {
    /// Creates a database handle from a configuration.
    ///
    /// Does not contact the server, [`DatabaseBuilder`](super::database_builder::DatabaseBuilder)
    /// is usually more convenient.
    pub fn connect(config: DatabaseConfig) -> Result<Self, NewDatabaseError> {
        if config.known_hosts.is_empty() {
            return Err(NewDatabaseError::EmptyKnownHostsList);
        }

        let mut hosts: Vec<Url> = Vec::with_capacity(config.known_hosts.len());
        for address in &config.known_hosts {
            let url = parse_host_url(address).map_err(|reason| NewDatabaseError::InvalidHostUrl {
                url: address.clone(),
                reason,
            })?;
            if !hosts.contains(&url) {
                hosts.push(url);
            }
        }

        let load_balancing_policy = match config.load_balancing_policy {
            Some(policy) => policy,
            None => {
                if config.load_balancing_strategy == LoadBalancingStrategy::None
                    && hosts.len() > 1
                    && !config.allow_multiple_hosts_without_balancing
                {
                    return Err(NewDatabaseError::TooManyHosts(hosts.len()));
                }
                config.load_balancing_strategy.into_policy()
            }
        };

        let transport: Arc<dyn Transport> = match config.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new().map_err(NewDatabaseError::Transport)?),
        };

        debug!(
            hosts = ?hosts.iter().map(Url::as_str).collect::<Vec<_>>(),
            database = %config.database_name,
            policy = %load_balancing_policy.name(),
            "Creating database handle"
        );

        let connection = Connection::new(ConnectionConfig {
            hosts,
            load_balancing_policy,
            retry_policy: config.retry_policy,
            authenticator: config.authenticator,
            transport,
            request_timeout: config.request_timeout,
            pool_size: config.pool_size.max(1),
        });

        Ok(Database {
            name: config.database_name.into(),
            connection: Arc::new(connection),
            default_query_options: Arc::new(config.default_query_options),
        })
    }

    /// Name of the database.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a handle of another database sharing this one's connection.
    pub fn database(&self, name: &str) -> Database {
        Database {
            name: name.into(),
            connection: Arc::clone(&self.connection),
            default_query_options: Arc::clone(&self.default_query_options),
        }
    }

    /// Returns a handle of a collection. Does not contact the server.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.clone(), name)
    }

    /// Returns a handle of a view. Does not contact the server.
    pub fn view(&self, name: &str) -> View {
        View::new(self.clone(), name)
    }

    /// Returns a handle of an analyzer. Does not contact the server.
    pub fn analyzer(&self, name: &str) -> Analyzer {
        Analyzer::new(self.clone(), name)
    }

    /// Returns the definitions of all analyzers visible in this database,
    /// built-in ones included.
    pub async fn list_analyzers(&self) -> Result<Vec<Value>, RequestError> {
        let response = self
            .request(Request::new(Method::GET, "/_api/analyzer"))
            .await?;
        Ok(response.json::<AnalyzerListBody>()?.result)
    }

    /// Returns handles of all analyzers visible in this database.
    pub async fn analyzers(&self) -> Result<Vec<Analyzer>, RequestError> {
        Ok(self
            .list_analyzers()
            .await?
            .iter()
            .filter_map(|definition| definition["name"].as_str())
            .map(|name| self.analyzer(name))
            .collect())
    }

    /// Returns a handle of an arbitrary path of the database.
    pub fn route(&self, path: &str) -> Route {
        Route::new(self.clone(), path, BTreeMap::new())
    }

    /// Returns a handle of an arbitrary path, sending `headers` with every request.
    pub fn route_with_headers(&self, path: &str, headers: BTreeMap<String, String>) -> Route {
        Route::new(self.clone(), path, headers)
    }

    /// Sends a request to a path of this database.
    ///
    /// Inside [`Transaction::step`] the request becomes part of the
    /// transaction, unless it already names one.
    pub async fn request(&self, request: Request) -> Result<Response, RequestError> {
        let mut request = request.with_path_prefix(&format!("/_db/{}", self.name));
        if let Some(scope) = TransactionScope::current().filter(|_| !request.detached) {
            trace!(transaction_id = %scope.id, "Request joins transaction");
            request = scope.apply(request);
        }
        self.connection.submit(request).await
    }

    /// Runs an AQL query with the default query options.
    pub async fn query(&self, query: impl Into<AqlQuery>) -> Result<Cursor, RequestError> {
        self.query_with_options(query, QueryOptions::default()).await
    }

    /// Runs an AQL query. Unset options fall back to the database defaults.
    pub async fn query_with_options(
        &self,
        query: impl Into<AqlQuery>,
        options: QueryOptions,
    ) -> Result<Cursor, RequestError> {
        let query = query.into();
        let options = options.merged_with(&self.default_query_options);

        let mut request =
            Request::new(Method::POST, "/_api/cursor").json(&CursorRequestBody::new(&query, &options))?;
        let allow_dirty_read = options.allow_dirty_read == Some(true);
        if allow_dirty_read {
            request = request.header(DIRTY_READ_HEADER, "true");
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = self.request(request).await?;
        let config = CursorConfig {
            transaction_id: TransactionScope::current().map(|scope| scope.id),
            allow_dirty_read,
            timeout: options.timeout,
            is_stream: options.is_stream(),
        };
        Cursor::new(self.clone(), response, config)
    }

    /// Begins a stream transaction.
    ///
    /// The returned handle keeps every step on the host that served the begin.
    pub async fn begin_transaction(
        &self,
        collections: TransactionCollections,
        options: TransactionOptions,
    ) -> Result<Transaction, RequestError> {
        let body = BeginTransactionBody {
            collections: &collections,
            options: &options,
        };
        let request = Request::new(Method::POST, "/_api/transaction/begin")
            .detached()
            .json(&body)?;
        let response = self.request(request).await?;
        let state = response.json::<TransactionStateBody>()?.result;
        debug!(
            transaction_id = %state.id,
            host = %response.host().url(),
            "Transaction started"
        );
        Ok(Transaction::new(
            self.clone(),
            state.id,
            state.status,
            Some(response.host().clone()),
        ))
    }

    /// Returns a handle of an existing transaction. Does not contact the server.
    ///
    /// The handle assumes the transaction is running, and its requests are
    /// balanced like any other.
    pub fn transaction(&self, id: impl Into<String>) -> Transaction {
        Transaction::new(self.clone(), id.into(), TransactionStatus::Running, None)
    }

    /// Lists the running stream transactions.
    pub async fn list_transactions(&self) -> Result<Vec<TransactionInfo>, RequestError> {
        let response = self
            .request(Request::new(Method::GET, "/_api/transaction"))
            .await?;
        Ok(response.json::<TransactionListBody>()?.transactions)
    }

    /// Runs a JavaScript transaction on the server and returns its result.
    ///
    /// `action` is the source of a JavaScript function, `params` is passed to
    /// it as its only argument.
    pub async fn execute_transaction(
        &self,
        collections: TransactionCollections,
        action: &str,
        params: Option<Value>,
    ) -> Result<Value, RequestError> {
        let mut body = json!({ "collections": collections, "action": action });
        if let Some(params) = params {
            body["params"] = params;
        }
        let response = self
            .request(Request::new(Method::POST, "/_api/transaction").json(&body)?)
            .await?;
        Ok(response.json::<ResultBody>()?.result)
    }

    /// Returns the server version information.
    pub async fn version(&self) -> Result<Value, RequestError> {
        self.request(Request::new(Method::GET, "/_api/version"))
            .await?
            .parsed_body()
    }

    /// Creates a collection and returns its handle.
    pub async fn create_collection(&self, name: &str) -> Result<Collection, RequestError> {
        let collection = self.collection(name);
        collection.create().await?;
        Ok(collection)
    }

    /// Current host list.
    pub fn hosts(&self) -> Arc<HostList> {
        self.connection.hosts()
    }

    /// Asks the cluster for its coordinators and adds them to the host list.
    ///
    /// Endpoints that cannot be parsed are skipped. Returns the host list
    /// after the update.
    pub async fn acquire_host_list(&self) -> Result<Arc<HostList>, RequestError> {
        let response = self
            .request(Request::new(Method::GET, "/_api/cluster/endpoints"))
            .await?;
        let endpoints = response.json::<EndpointsBody>()?.endpoints;

        let urls: Vec<Url> = endpoints
            .into_iter()
            .filter_map(|Endpoint { endpoint }| match parse_host_url(&endpoint) {
                Ok(url) => Some(url),
                Err(reason) => {
                    warn!(%endpoint, %reason, "Skipping cluster endpoint");
                    None
                }
            })
            .collect();

        self.connection.add_to_host_list(urls);
        Ok(self.connection.hosts())
    }

    /// Replaces the host list.
    ///
    /// Hosts that stay in the list keep their pools, so pinned cursors and
    /// transactions on them keep working.
    pub fn set_host_list<I, S>(&self, hosts: I) -> Result<(), NewDatabaseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls = Self::parse_hosts(hosts)?;
        if urls.is_empty() {
            return Err(NewDatabaseError::EmptyKnownHostsList);
        }
        self.connection.set_host_list(urls);
        Ok(())
    }

    /// Adds hosts to the host list. Hosts already present are ignored.
    pub fn add_to_host_list<I, S>(&self, hosts: I) -> Result<(), NewDatabaseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls = Self::parse_hosts(hosts)?;
        self.connection.add_to_host_list(urls);
        Ok(())
    }

    fn parse_hosts<I, S>(hosts: I) -> Result<Vec<Url>, NewDatabaseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        hosts
            .into_iter()
            .map(|address| {
                let address = address.as_ref();
                parse_host_url(address).map_err(|reason| NewDatabaseError::InvalidHostUrl {
                    url: address.to_owned(),
                    reason,
                })
            })
            .collect()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("hosts", &self.connection.hosts().urls())
            .field("default_query_options", &self.default_query_options)
            .finish()
    }
}

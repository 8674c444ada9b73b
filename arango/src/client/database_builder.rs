//! DatabaseBuilder provides an easy way to create new Database handles

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::database::{Database, DatabaseConfig};
use crate::authentication::{
    AuthenticatorProvider, BearerTokenAuthenticator, PlainTextAuthenticator,
};
use crate::client::query_options::QueryOptions;
use crate::errors::NewDatabaseError;
use crate::network::Transport;
use crate::policies::load_balancing::{LoadBalancingPolicy, LoadBalancingStrategy};
use crate::policies::retry::RetryPolicy;

/// DatabaseBuilder is used to create new Database handles
/// # Example
///
/// ```
/// # use arango::{Database, DatabaseBuilder, LoadBalancingStrategy};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db: Database = DatabaseBuilder::new()
///     .known_hosts(["http://127.0.0.1:8529", "http://127.0.0.2:8529"])
///     .load_balancing_strategy(LoadBalancingStrategy::RoundRobin)
///     .database_name("shop")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DatabaseBuilder {
    /// Configuration the database handle is built from.
    pub config: DatabaseConfig,
}

impl DatabaseBuilder {
    /// Creates new DatabaseBuilder with default configuration
    /// # Default configuration
    /// * database name: `_system`
    /// * load balancing: none, a single host
    /// * request timeout: 60 seconds
    /// * pool size: 3 requests per host
    pub fn new() -> Self {
        DatabaseBuilder {
            config: DatabaseConfig::new(),
        }
    }

    /// Add a known host with a URL or a `host:port` address
    /// # Examples
    /// ```
    /// # use arango::{Database, DatabaseBuilder};
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db: Database = DatabaseBuilder::new()
    ///     .known_host("https://db1.example.com:8529")
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn known_host(mut self, address: impl Into<String>) -> Self {
        self.config.known_hosts.push(address.into());
        self
    }

    /// Add a list of known hosts
    /// # Example
    /// ```
    /// # use arango::{Database, DatabaseBuilder, LoadBalancingStrategy};
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db: Database = DatabaseBuilder::new()
    ///     .known_hosts(["tcp://127.0.0.1:8529", "tcp://127.0.0.2:8529"])
    ///     .load_balancing_strategy(LoadBalancingStrategy::OneRandom)
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn known_hosts<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .known_hosts
            .extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Set the name of the database, `_system` by default.
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.config.database_name = name.into();
        self
    }

    /// Set how requests are spread between the known hosts.
    pub fn load_balancing_strategy(mut self, strategy: LoadBalancingStrategy) -> Self {
        self.config.load_balancing_strategy = strategy;
        self
    }

    /// Use a custom load balancing policy instead of one of the built-in strategies.
    pub fn load_balancing_policy(mut self, policy: Arc<dyn LoadBalancingPolicy>) -> Self {
        self.config.load_balancing_policy = Some(policy);
        self
    }

    /// Allow more than one known host without a load balancing strategy.
    /// Every request then goes to the first host.
    pub fn allow_multiple_hosts_without_balancing(mut self, allow: bool) -> Self {
        self.config.allow_multiple_hosts_without_balancing = allow;
        self
    }

    /// Sets the username and password for HTTP basic authentication
    /// # Example
    /// ```
    /// # use arango::{Database, DatabaseBuilder};
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db: Database = DatabaseBuilder::new()
    ///     .known_host("127.0.0.1:8529")
    ///     .user("root", "openSesame")
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn user(mut self, username: impl Into<String>, passwd: impl Into<String>) -> Self {
        self.config.authenticator = Some(Arc::new(PlainTextAuthenticator::new(
            username.into(),
            passwd.into(),
        )));
        self
    }

    /// Authenticates every request with a JWT bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.authenticator = Some(Arc::new(BearerTokenAuthenticator::new(token.into())));
        self
    }

    /// Sets custom authenticator provider. Replaces credentials set with
    /// [`user`](DatabaseBuilder::user) or [`bearer_token`](DatabaseBuilder::bearer_token).
    pub fn authenticator_provider(
        mut self,
        authenticator_provider: Arc<dyn AuthenticatorProvider>,
    ) -> Self {
        self.config.authenticator = Some(authenticator_provider);
        self
    }

    /// Changes the default request timeout.
    /// The default value is 60 seconds. `None` disables client-side timeouts.
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the policy deciding whether failed requests are retried.
    pub fn retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        self.config.retry_policy = retry_policy;
        self
    }

    /// Set the number of requests a single host may have in flight.
    /// Further requests to the host wait for a free slot, in order.
    /// The default is 3.
    pub fn pool_size(mut self, size: usize) -> Self {
        if size == 0 {
            warn!("Pool size must be positive, using 1");
        }
        self.config.pool_size = size.max(1);
        self
    }

    /// Set the query options every query falls back to.
    pub fn default_query_options(mut self, options: QueryOptions) -> Self {
        self.config.default_query_options = options;
        self
    }

    /// Use a custom HTTP transport instead of the reqwest one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    /// Builds the Database handle.
    ///
    /// Fails on an empty or invalid host list, or when several hosts are
    /// given without load balancing. Does not contact the server.
    pub fn build(&self) -> Result<Database, NewDatabaseError> {
        Database::connect(self.config.clone())
    }
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        DatabaseBuilder::new()
    }
}

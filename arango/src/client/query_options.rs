//! Options of AQL queries.

use std::time::Duration;

use serde::Serialize;

/// Options for a single AQL query.
///
/// Unset options fall back to the defaults configured with
/// [`DatabaseBuilder::default_query_options`](crate::DatabaseBuilder::default_query_options),
/// and then to the server defaults.
///
/// ```rust
/// use arango::QueryOptions;
/// use std::time::Duration;
///
/// let options = QueryOptions::new()
///     .batch_size(500)
///     .stream(true)
///     .max_runtime(Duration::from_secs(10));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct QueryOptions {
    /// Number of results per batch.
    pub batch_size: Option<u32>,
    /// Ask the server to count the results. Ignored for stream queries.
    pub count: Option<bool>,
    /// Time the server keeps an idle cursor alive.
    pub ttl: Option<Duration>,
    /// Compute results lazily, batch by batch.
    pub stream: Option<bool>,
    /// Abort the query on the server after this long.
    pub max_runtime: Option<Duration>,
    /// Report the number of results ignoring the last top-level `LIMIT`.
    pub full_count: Option<bool>,
    /// Use the query results cache.
    pub cache: Option<bool>,
    /// Memory limit of the query, in bytes.
    pub memory_limit: Option<u64>,
    /// Allow reading from followers in a cluster.
    pub allow_dirty_read: Option<bool>,
    /// Client-side timeout of each request of the query.
    pub timeout: Option<Duration>,
}

impl QueryOptions {
    /// Creates options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of results per batch.
    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Asks the server to count the results.
    pub fn count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the time the server keeps an idle cursor alive.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Makes this a stream query.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Sets the maximum runtime of the query on the server.
    pub fn max_runtime(mut self, max_runtime: Duration) -> Self {
        self.max_runtime = Some(max_runtime);
        self
    }

    /// Asks for the full count.
    pub fn full_count(mut self, full_count: bool) -> Self {
        self.full_count = Some(full_count);
        self
    }

    /// Enables or disables the query results cache.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the memory limit of the query, in bytes.
    pub fn memory_limit(mut self, memory_limit: u64) -> Self {
        self.memory_limit = Some(memory_limit);
        self
    }

    /// Allows reading from followers.
    pub fn allow_dirty_read(mut self, allow_dirty_read: bool) -> Self {
        self.allow_dirty_read = Some(allow_dirty_read);
        self
    }

    /// Sets the client-side timeout of each request of the query.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fills every unset option from `defaults`.
    pub fn merged_with(&self, defaults: &QueryOptions) -> QueryOptions {
        QueryOptions {
            batch_size: self.batch_size.or(defaults.batch_size),
            count: self.count.or(defaults.count),
            ttl: self.ttl.or(defaults.ttl),
            stream: self.stream.or(defaults.stream),
            max_runtime: self.max_runtime.or(defaults.max_runtime),
            full_count: self.full_count.or(defaults.full_count),
            cache: self.cache.or(defaults.cache),
            memory_limit: self.memory_limit.or(defaults.memory_limit),
            allow_dirty_read: self.allow_dirty_read.or(defaults.allow_dirty_read),
            timeout: self.timeout.or(defaults.timeout),
        }
    }

    pub(crate) fn is_stream(&self) -> bool {
        self.stream == Some(true)
    }
}

/// Body of `POST /_api/cursor`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CursorRequestBody<'a> {
    query: &'a str,
    bind_vars: &'a arango_aql::BindVars,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_limit: Option<u64>,
    #[serde(skip_serializing_if = "CursorSubOptions::is_empty")]
    options: CursorSubOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CursorSubOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_runtime: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_count: Option<bool>,
}

impl CursorSubOptions {
    fn is_empty(&self) -> bool {
        self.stream.is_none() && self.max_runtime.is_none() && self.full_count.is_none()
    }
}

impl<'a> CursorRequestBody<'a> {
    pub(crate) fn new(query: &'a arango_aql::AqlQuery, options: &QueryOptions) -> Self {
        CursorRequestBody {
            query: query.query(),
            bind_vars: query.bind_vars(),
            batch_size: options.batch_size,
            count: options.count,
            ttl: options.ttl.map(|ttl| ttl.as_secs_f64()),
            cache: options.cache,
            memory_limit: options.memory_limit,
            options: CursorSubOptions {
                stream: options.stream,
                max_runtime: options.max_runtime.map(|runtime| runtime.as_secs_f64()),
                full_count: options.full_count,
            },
        }
    }
}

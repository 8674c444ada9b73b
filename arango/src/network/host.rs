use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};
use url::Url;

use crate::errors::{ConnectionError, TransportError};

/// One server endpoint the driver sends requests to.
///
/// Each host bounds the number of requests in flight to it with a FIFO
/// permit pool, and remembers whether the last attempt on it failed at
/// connection level. Failed hosts are deprioritized by the load balancing
/// policies, never removed.
pub struct Host {
    url: Url,
    permits: Semaphore,
    pool_size: usize,
    healthy: AtomicBool,
}

impl Host {
    pub(crate) fn new(url: Url, pool_size: usize) -> Self {
        Host {
            url,
            permits: Semaphore::new(pool_size),
            pool_size,
            healthy: AtomicBool::new(true),
        }
    }

    /// Base URL of the host.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns `false` if the last attempt on this host failed at connection level.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Number of requests currently holding a permit of this host.
    pub fn in_flight(&self) -> usize {
        self.pool_size - self.permits.available_permits()
    }

    pub(crate) fn mark_failed(&self) {
        self.healthy.store(false, Ordering::Relaxed);
    }

    pub(crate) fn mark_healthy(&self) {
        self.healthy.store(true, Ordering::Relaxed);
    }

    pub(crate) async fn acquire(&self) -> Result<SemaphorePermit<'_>, ConnectionError> {
        self.permits
            .acquire()
            .await
            .map_err(|err| ConnectionError::Transport {
                host: self.url.to_string(),
                source: TransportError::new(err),
            })
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("url", &self.url.as_str())
            .field("healthy", &self.is_healthy())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Opaque handle pinning requests to one host.
///
/// Obtained from a [`Response`](crate::network::Response) and carried by
/// cursors and transactions, so that follow-up requests reach the host that
/// holds the server-side state. It stays valid when the host list changes.
#[derive(Clone)]
pub struct HostRef(Arc<Host>);

impl HostRef {
    pub(crate) fn new(host: &Arc<Host>) -> Self {
        HostRef(Arc::clone(host))
    }

    pub(crate) fn host(&self) -> &Arc<Host> {
        &self.0
    }

    /// Base URL of the pinned host.
    pub fn url(&self) -> &Url {
        self.0.url()
    }
}

impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for HostRef {}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostRef").field(&self.0.url.as_str()).finish()
    }
}

/// Ordered list of hosts requests are balanced across.
///
/// The driver never mutates a `HostList` in place, changes replace the
/// whole list.
#[derive(Debug, Default)]
pub struct HostList {
    hosts: Vec<Arc<Host>>,
}

impl HostList {
    pub(crate) fn new(hosts: Vec<Arc<Host>>) -> Self {
        HostList { hosts }
    }

    /// Hosts in configuration order.
    pub fn hosts(&self) -> &[Arc<Host>] {
        &self.hosts
    }

    /// Number of hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns `true` if there are no hosts.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Base URLs of all hosts.
    pub fn urls(&self) -> Vec<Url> {
        self.hosts.iter().map(|host| host.url().clone()).collect()
    }

    pub(crate) fn find(&self, url: &Url) -> Option<&Arc<Host>> {
        self.hosts.iter().find(|host| host.url() == url)
    }
}

/// Parses a host address into a base URL.
///
/// Addresses without a scheme are assumed to be plain HTTP. The cluster
/// endpoint schemes `tcp://` and `ssl://` map to `http://` and `https://`.
pub(crate) fn parse_host_url(address: &str) -> Result<Url, String> {
    let address = address.trim();
    let normalized = if let Some(rest) = address.strip_prefix("tcp://") {
        format!("http://{rest}")
    } else if let Some(rest) = address.strip_prefix("ssl://") {
        format!("https://{rest}")
    } else if address.contains("://") {
        address.to_owned()
    } else {
        format!("http://{address}")
    };

    let url = Url::parse(&normalized).map_err(|err| err.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}

//! Load balancing configurations\
//! `Database` can use any load balancing policy which implements the `LoadBalancingPolicy` trait.

use std::sync::Arc;
use std::time::Duration;

use crate::errors::RequestAttemptError;
use crate::network::{Host, HostList, Method};

mod one_random;
mod plan;
mod round_robin;
mod single_host;

pub use one_random::OneRandomPolicy;
pub(crate) use plan::Plan;
pub use round_robin::RoundRobinPolicy;
pub use single_host::SingleHostPolicy;

/// Represents info about a request that can be used by load balancing policies.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct RoutingInfo<'a> {
    /// HTTP method of the request.
    pub method: &'a Method,
    /// Database-scoped path of the request.
    pub path: &'a str,
    /// Whether the request may be sent again after a connection failure.
    pub is_idempotent: bool,
}

impl<'a> RoutingInfo<'a> {
    pub(crate) fn new(method: &'a Method, path: &'a str, is_idempotent: bool) -> Self {
        RoutingInfo {
            method,
            path,
            is_idempotent,
        }
    }
}

/// The fallback list of hosts in the request plan.
///
/// It is computed on-demand, only if sending to the most preferred host fails.
pub type FallbackPlan<'a> = Box<dyn Iterator<Item = &'a Arc<Host>> + Send + Sync + 'a>;

/// Policy that decides which hosts to contact for each request.
///
/// For every request that is not pinned to a host, a `LoadBalancingPolicy`
/// implementation constructs a load balancing plan: the hosts the driver will
/// try, in order, until one of them answers or the retry policy gives up.
///
/// Most requests are sent on the first try, so `LoadBalancingPolicy` has two
/// methods: `pick` returns the first host to contact, `fallback` returns the
/// rest of the plan. The host returned by `pick` is filtered out of the
/// fallback by the driver.
pub trait LoadBalancingPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the first host to contact for a given request.
    fn pick<'a>(&'a self, request: &'a RoutingInfo, hosts: &'a HostList)
        -> Option<&'a Arc<Host>>;

    /// Returns all contact-appropriate hosts for a given request.
    fn fallback<'a>(&'a self, request: &'a RoutingInfo, hosts: &'a HostList) -> FallbackPlan<'a>;

    /// Invoked each time a request succeeds.
    fn on_request_success(&self, _request: &RoutingInfo, _latency: Duration, _host: &Arc<Host>) {}

    /// Invoked each time a request fails.
    fn on_request_failure(
        &self,
        _request: &RoutingInfo,
        _latency: Duration,
        _host: &Arc<Host>,
        _error: &RequestAttemptError,
    ) {
    }

    /// Returns the name of load balancing policy.
    fn name(&self) -> String;
}

/// Built-in ways of spreading requests across the configured hosts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadBalancingStrategy {
    /// Always use the first host. Only one host may be configured, unless
    /// explicitly allowed when building the database.
    #[default]
    None,
    /// Rotate through the hosts, one request each.
    RoundRobin,
    /// Pick a host uniformly at random for every request.
    OneRandom,
}

impl LoadBalancingStrategy {
    /// Creates the policy implementing this strategy.
    pub fn into_policy(self) -> Arc<dyn LoadBalancingPolicy> {
        match self {
            LoadBalancingStrategy::None => Arc::new(SingleHostPolicy::new()),
            LoadBalancingStrategy::RoundRobin => Arc::new(RoundRobinPolicy::new()),
            LoadBalancingStrategy::OneRandom => Arc::new(OneRandomPolicy::new()),
        }
    }
}

/// Hosts of the list starting at `start`, wrapping around, healthy ones first.
fn rotated_by_health<'a>(
    hosts: &'a HostList,
    start: usize,
) -> impl Iterator<Item = &'a Arc<Host>> + Send + Sync + 'a {
    let len = hosts.len();
    let rotation = move || {
        (0..len).map(move |offset| &hosts.hosts()[(start + offset) % len])
    };
    rotation()
        .filter(|host| host.is_healthy())
        .chain(rotation().filter(|host| !host.is_healthy()))
}

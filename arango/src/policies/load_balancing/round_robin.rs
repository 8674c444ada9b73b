use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{rotated_by_health, FallbackPlan, LoadBalancingPolicy, RoutingInfo};
use crate::network::{Host, HostList};

/// Load balancing policy that rotates through the hosts.
///
/// Every request advances a shared index, whatever its outcome, so with N
/// healthy hosts N consecutive requests hit each host exactly once, in host
/// list order. Hosts whose last attempt failed are skipped while a healthy
/// host exists, and come last in the fallback.
#[derive(Debug, Default)]
pub struct RoundRobinPolicy {
    index: AtomicUsize,
}

impl RoundRobinPolicy {
    /// Creates a new instance of [`RoundRobinPolicy`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancingPolicy for RoundRobinPolicy {
    fn pick<'a>(
        &'a self,
        _request: &'a RoutingInfo,
        hosts: &'a HostList,
    ) -> Option<&'a Arc<Host>> {
        if hosts.is_empty() {
            return None;
        }
        let start = self.index.fetch_add(1, Ordering::Relaxed);
        rotated_by_health(hosts, start % hosts.len()).next()
    }

    fn fallback<'a>(&'a self, _request: &'a RoutingInfo, hosts: &'a HostList) -> FallbackPlan<'a> {
        if hosts.is_empty() {
            return Box::new(std::iter::empty());
        }
        // The index already points past the host `pick` chose.
        let start = self.index.load(Ordering::Relaxed) % hosts.len();
        Box::new(rotated_by_health(hosts, start))
    }

    fn name(&self) -> String {
        "RoundRobinPolicy".to_string()
    }
}

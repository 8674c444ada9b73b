use std::sync::Arc;

use super::{FallbackPlan, LoadBalancingPolicy, RoutingInfo};
use crate::network::{Host, HostList};

/// Load balancing policy that sends every request to the first host.
///
/// The plan never contains another host, so requests are not failed over.
#[derive(Debug, Default)]
pub struct SingleHostPolicy;

impl SingleHostPolicy {
    /// Creates a new instance of [`SingleHostPolicy`].
    pub fn new() -> Self {
        SingleHostPolicy
    }
}

impl LoadBalancingPolicy for SingleHostPolicy {
    fn pick<'a>(
        &'a self,
        _request: &'a RoutingInfo,
        hosts: &'a HostList,
    ) -> Option<&'a Arc<Host>> {
        hosts.hosts().first()
    }

    fn fallback<'a>(&'a self, _request: &'a RoutingInfo, hosts: &'a HostList) -> FallbackPlan<'a> {
        Box::new(hosts.hosts().first().into_iter())
    }

    fn name(&self) -> String {
        "SingleHostPolicy".to_string()
    }
}

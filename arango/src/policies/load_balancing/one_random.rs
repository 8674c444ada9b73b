use std::sync::{Arc, Mutex, PoisonError};

use rand::{rng, Rng};
use rand_pcg::Pcg32;

use super::{FallbackPlan, LoadBalancingPolicy, RoutingInfo};
use crate::network::{Host, HostList};

/// Load balancing policy that picks a host uniformly at random for every request.
///
/// Only healthy hosts are drawn from while there is one. The fallback lists
/// the remaining hosts in host list order, healthy ones first.
#[derive(Debug, Default)]
pub struct OneRandomPolicy {
    fixed_seed: Option<Mutex<Pcg32>>,
}

impl OneRandomPolicy {
    /// Creates a new instance of [`OneRandomPolicy`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy drawing hosts from a generator with a fixed seed,
    /// so that the sequence of picks is reproducible.
    pub fn with_fixed_seed(seed: u64) -> Self {
        OneRandomPolicy {
            fixed_seed: Some(Mutex::new(Pcg32::new(seed, 0))),
        }
    }

    fn random_index(&self, len: usize) -> usize {
        match &self.fixed_seed {
            Some(generator) => generator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random_range(0..len),
            None => rng().random_range(0..len), // random_range() panics when range is empty!
        }
    }
}

impl LoadBalancingPolicy for OneRandomPolicy {
    fn pick<'a>(
        &'a self,
        _request: &'a RoutingInfo,
        hosts: &'a HostList,
    ) -> Option<&'a Arc<Host>> {
        let healthy: Vec<&Arc<Host>> = hosts
            .hosts()
            .iter()
            .filter(|host| host.is_healthy())
            .collect();

        if !healthy.is_empty() {
            Some(healthy[self.random_index(healthy.len())])
        } else if !hosts.is_empty() {
            Some(&hosts.hosts()[self.random_index(hosts.len())])
        } else {
            None
        }
    }

    fn fallback<'a>(&'a self, _request: &'a RoutingInfo, hosts: &'a HostList) -> FallbackPlan<'a> {
        Box::new(super::rotated_by_health(hosts, 0))
    }

    fn name(&self) -> String {
        "OneRandomPolicy".to_string()
    }
}

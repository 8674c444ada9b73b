use std::sync::Arc;

use tracing::error;

use super::{FallbackPlan, LoadBalancingPolicy, RoutingInfo};
use crate::network::{Host, HostList};

enum PlanState<'a> {
    Created,
    PickedNone, // Abnormal: the policy returned no host at all.
    Picked(&'a Arc<Host>),
    Fallback {
        iter: FallbackPlan<'a>,
        host_to_filter_out: &'a Arc<Host>,
    },
}

/// The list of hosts constituting the request plan.
///
/// The plan is partly lazily computed, with the first host computed
/// eagerly in the first place and the remaining hosts computed on-demand
/// (all at once).
/// This significantly reduces the allocation overhead on "the happy path"
/// (when the first host successfully handles the request).
pub(crate) struct Plan<'a> {
    policy: &'a dyn LoadBalancingPolicy,
    routing_info: &'a RoutingInfo<'a>,
    hosts: &'a HostList,

    state: PlanState<'a>,
}

impl<'a> Plan<'a> {
    pub(crate) fn new(
        policy: &'a dyn LoadBalancingPolicy,
        routing_info: &'a RoutingInfo<'a>,
        hosts: &'a HostList,
    ) -> Self {
        Self {
            policy,
            routing_info,
            hosts,
            state: PlanState::Created,
        }
    }
}

impl<'a> Iterator for Plan<'a> {
    type Item = &'a Arc<Host>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            PlanState::Created => {
                let picked = self.policy.pick(self.routing_info, self.hosts);
                if let Some(picked) = picked {
                    self.state = PlanState::Picked(picked);
                    Some(picked)
                } else {
                    // `pick()` returning None does not imply an empty fallback.
                    let mut iter = self.policy.fallback(self.routing_info, self.hosts);
                    let first_fallback_host = iter.next();
                    if let Some(host) = first_fallback_host {
                        self.state = PlanState::Fallback {
                            iter,
                            host_to_filter_out: host,
                        };
                        Some(host)
                    } else {
                        error!(
                            policy = %self.policy.name(),
                            "Load balancing policy returned an empty plan! The request cannot be executed. Routing info: {:?}",
                            self.routing_info
                        );
                        self.state = PlanState::PickedNone;
                        None
                    }
                }
            }
            PlanState::Picked(host) => {
                self.state = PlanState::Fallback {
                    iter: self.policy.fallback(self.routing_info, self.hosts),
                    host_to_filter_out: *host,
                };

                self.next()
            }
            PlanState::Fallback {
                iter,
                host_to_filter_out,
            } => {
                for host in iter {
                    if Arc::ptr_eq(host, *host_to_filter_out) {
                        continue;
                    } else {
                        return Some(host);
                    }
                }

                None
            }
            PlanState::PickedNone => None,
        }
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tracing::{debug, trace, trace_span, Instrument};
use url::Url;

use super::host::{Host, HostList, HostRef};
use super::request::{Request, Response};
use super::transport::Transport;
use crate::authentication::AuthenticatorProvider;
use crate::errors::{ConnectionError, RequestAttemptError, RequestError};
use crate::policies::load_balancing::{LoadBalancingPolicy, Plan, RoutingInfo};
use crate::policies::retry::{RequestInfo, RetryDecision, RetryPolicy};

/// Settings the connection layer is created with.
pub(crate) struct ConnectionConfig {
    pub(crate) hosts: Vec<Url>,
    pub(crate) load_balancing_policy: Arc<dyn LoadBalancingPolicy>,
    pub(crate) retry_policy: Arc<dyn RetryPolicy>,
    pub(crate) authenticator: Option<Arc<dyn AuthenticatorProvider>>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) pool_size: usize,
}

/// Dispatches requests to the hosts of a deployment.
///
/// Shared by all database handles created from one builder. The host list
/// is the only state that changes after construction, and it is swapped
/// atomically as a whole.
pub(crate) struct Connection {
    hosts: ArcSwap<HostList>,
    load_balancing_policy: Arc<dyn LoadBalancingPolicy>,
    retry_policy: Arc<dyn RetryPolicy>,
    authenticator: Option<Arc<dyn AuthenticatorProvider>>,
    transport: Arc<dyn Transport>,
    request_timeout: Option<Duration>,
    pool_size: usize,
}

impl Connection {
    pub(crate) fn new(config: ConnectionConfig) -> Self {
        let hosts = config
            .hosts
            .into_iter()
            .map(|url| Arc::new(Host::new(url, config.pool_size)))
            .collect();

        Connection {
            hosts: ArcSwap::from_pointee(HostList::new(hosts)),
            load_balancing_policy: config.load_balancing_policy,
            retry_policy: config.retry_policy,
            authenticator: config.authenticator,
            transport: config.transport,
            request_timeout: config.request_timeout,
            pool_size: config.pool_size,
        }
    }

    /// Current host list.
    pub(crate) fn hosts(&self) -> Arc<HostList> {
        self.hosts.load_full()
    }

    /// Replaces the host list. Hosts whose URL stays in the list are kept,
    /// so pins and in-flight permits on them remain valid.
    pub(crate) fn set_host_list(&self, urls: Vec<Url>) {
        self.hosts.rcu(|current| {
            let mut hosts: Vec<Arc<Host>> = Vec::with_capacity(urls.len());
            for url in &urls {
                if hosts.iter().any(|host| host.url() == url) {
                    continue;
                }
                let host = match current.find(url) {
                    Some(existing) => Arc::clone(existing),
                    None => Arc::new(Host::new(url.clone(), self.pool_size)),
                };
                hosts.push(host);
            }
            HostList::new(hosts)
        });
        debug!(hosts = ?urls.iter().map(Url::as_str).collect::<Vec<_>>(), "Host list replaced");
    }

    /// Appends hosts that are not in the list yet.
    pub(crate) fn add_to_host_list(&self, urls: Vec<Url>) {
        self.hosts.rcu(|current| {
            let mut hosts = current.hosts().to_vec();
            for url in &urls {
                if !hosts.iter().any(|host| host.url() == url) {
                    hosts.push(Arc::new(Host::new(url.clone(), self.pool_size)));
                }
            }
            HostList::new(hosts)
        });
        debug!(hosts = ?urls.iter().map(Url::as_str).collect::<Vec<_>>(), "Hosts added to host list");
    }

    /// Sends a request, following the load balancing plan and the retry
    /// policy unless the request is pinned to a host.
    pub(crate) async fn submit(&self, request: Request) -> Result<Response, RequestError> {
        let authorization = match &self.authenticator {
            Some(authenticator) => authenticator
                .authorization_header()
                .await
                .map_err(RequestError::Authentication)?,
            None => None,
        };
        let authorization = authorization.as_deref();

        if let Some(pinned) = &request.host {
            let span = trace_span!(
                "Executing request",
                host = %pinned.url(),
                method = %request.method,
                path = %request.path,
                pinned = true,
            );
            trace!(parent: &span, "Sending");
            let result = self
                .attempt(pinned.host(), &request, authorization)
                .instrument(span.clone())
                .await;
            match &result {
                Ok(_) => trace!(parent: &span, "Request succeeded"),
                Err(e) => trace!(parent: &span, error = %e, "Request failed"),
            }
            return result.map_err(RequestError::from);
        }

        let hosts = self.hosts.load_full();
        let routing_info =
            RoutingInfo::new(&request.method, &request.path, request.is_idempotent());
        let plan = Plan::new(&*self.load_balancing_policy, &routing_info, &hosts);
        let mut retry_session = self.retry_policy.new_session();
        let mut last_error: Option<RequestError> = None;

        'hosts_in_plan: for host in plan {
            let span = trace_span!(
                "Executing request",
                host = %host.url(),
                method = %request.method,
                path = %request.path,
            );
            'same_host_retries: loop {
                trace!(parent: &span, "Sending");
                let request_start = Instant::now();
                let request_result = self
                    .attempt(host, &request, authorization)
                    .instrument(span.clone())
                    .await;

                let elapsed = request_start.elapsed();
                let request_error: RequestAttemptError = match request_result {
                    Ok(response) => {
                        trace!(parent: &span, "Request succeeded");
                        self.load_balancing_policy
                            .on_request_success(&routing_info, elapsed, host);
                        return Ok(response);
                    }
                    Err(e) => {
                        trace!(
                            parent: &span,
                            last_error = %e,
                            "Request failed"
                        );
                        self.load_balancing_policy
                            .on_request_failure(&routing_info, elapsed, host, &e);
                        e
                    }
                };

                // Use retry policy to decide what to do next
                let request_info = RequestInfo::new(&request_error, routing_info.is_idempotent);
                let retry_decision = retry_session.decide_should_retry(request_info);
                trace!(
                    parent: &span,
                    retry_decision = ?retry_decision
                );

                last_error = Some(request_error.into());

                match retry_decision {
                    RetryDecision::RetrySameHost => continue 'same_host_retries,
                    RetryDecision::RetryNextHost => continue 'hosts_in_plan,
                    RetryDecision::DontRetry => break 'hosts_in_plan,
                }
            }
        }

        Err(last_error.unwrap_or(RequestError::EmptyPlan))
    }

    /// A single attempt on one host.
    async fn attempt(
        &self,
        host: &Arc<Host>,
        request: &Request,
        authorization: Option<&str>,
    ) -> Result<Response, RequestAttemptError> {
        // The deadline covers the wait for a free slot on the host as well.
        let sent = async {
            let _permit = host.acquire().await?;
            let http_request = request.to_http(host.url(), authorization);
            Ok::<_, ConnectionError>(self.transport.send(http_request).await)
        };
        let result = match request.timeout.or(self.request_timeout) {
            Some(timeout) => match tokio::time::timeout(timeout, sent).await {
                Ok(result) => result?,
                Err(_) => {
                    host.mark_failed();
                    return Err(ConnectionError::Timeout {
                        host: host.url().to_string(),
                        timeout,
                    }
                    .into());
                }
            },
            None => sent.await?,
        };

        match result {
            Ok(response) => {
                host.mark_healthy();
                Response::from_http(response, HostRef::new(host))
            }
            Err(source) => {
                host.mark_failed();
                Err(ConnectionError::Transport {
                    host: host.url().to_string(),
                    source,
                }
                .into())
            }
        }
    }
}

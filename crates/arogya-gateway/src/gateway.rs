//! Resilient execution of remote calls.
//!
//! `RemoteGateway` runs each call with a bounded retry budget, exponential
//! backoff on retryable failures, per-endpoint timeouts, and a shared pooled
//! HTTP client. Callers see every failure uniformly as `None`; the detail
//! (timeout vs. 5xx vs. malformed body) goes to tracing only.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, warn};
use uuid::Uuid;

use arogya_core::config::RetryConfig;
use arogya_core::error::{ArogyaError, Result};

use crate::endpoint::{Endpoint, EndpointId, EndpointSet};

/// HTTP statuses that warrant a retry with backoff.
const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Retry budget and backoff base for the gateway.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Base backoff delay; attempt `n` (zero-based) waits `base * 2^n`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// The seam through which callers execute remote requests.
///
/// Implemented by [`RemoteGateway`] in production and by in-crate mocks in
/// dependent crates' tests. A `None` result means "service unavailable" —
/// callers must not distinguish failure modes.
#[async_trait]
pub trait RemoteCall: Send + Sync {
    async fn call(&self, endpoint: EndpointId, payload: &Value) -> Option<Value>;
}

/// Gateway over the fixed endpoint set with one shared pooled client.
pub struct RemoteGateway {
    client: reqwest::Client,
    endpoints: EndpointSet,
    retry: RetryPolicy,
}

impl RemoteGateway {
    /// Build the gateway. Fails only on client construction, which is a
    /// startup-time configuration defect.
    pub fn new(
        endpoints: EndpointSet,
        retry: RetryPolicy,
        pool_max_idle_per_host: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(pool_max_idle_per_host)
            .build()
            .map_err(|e| ArogyaError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoints,
            retry,
        })
    }

    /// Execute one attempt cycle against an endpoint.
    async fn execute(&self, endpoint: &Endpoint, payload: &Value) -> Option<Value> {
        let request_id = format!("req_{}", Uuid::new_v4());

        for attempt in 0..self.retry.max_attempts {
            debug!(
                endpoint = %endpoint.id,
                request_id = %request_id,
                attempt = attempt + 1,
                max_attempts = self.retry.max_attempts,
                "Remote call attempt"
            );

            let sent = self
                .client
                .request(endpoint.method.clone(), endpoint.url.clone())
                .timeout(endpoint.timeout)
                .header("x-request-id", &request_id)
                .header("x-retry-attempt", (attempt + 1).to_string())
                .json(payload)
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.json::<Value>().await {
                            Ok(body) => {
                                debug!(endpoint = %endpoint.id, %status, "Remote call succeeded");
                                return Some(body);
                            }
                            Err(e) => {
                                error!(
                                    endpoint = %endpoint.id,
                                    error = %e,
                                    "Remote call returned unparseable body"
                                );
                                return None;
                            }
                        }
                    } else if RETRYABLE_STATUSES.contains(&status.as_u16()) {
                        warn!(
                            endpoint = %endpoint.id,
                            %status,
                            attempt = attempt + 1,
                            "Retryable status from remote"
                        );
                        if attempt + 1 < self.retry.max_attempts {
                            tokio::time::sleep(self.retry.backoff(attempt)).await;
                            continue;
                        }
                    } else {
                        error!(endpoint = %endpoint.id, %status, "Terminal status from remote");
                        return None;
                    }
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!(
                        endpoint = %endpoint.id,
                        error = %e,
                        attempt = attempt + 1,
                        "Remote call transport failure"
                    );
                    if attempt + 1 < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff(attempt)).await;
                        continue;
                    }
                }
                Err(e) => {
                    error!(endpoint = %endpoint.id, error = %e, "Remote call failed");
                    return None;
                }
            }
        }

        error!(
            endpoint = %endpoint.id,
            attempts = self.retry.max_attempts,
            "Remote call exhausted retry budget"
        );
        None
    }
}

#[async_trait]
impl RemoteCall for RemoteGateway {
    async fn call(&self, endpoint: EndpointId, payload: &Value) -> Option<Value> {
        let descriptor = self.endpoints.get(endpoint);
        self.execute(descriptor, payload).await
    }
}

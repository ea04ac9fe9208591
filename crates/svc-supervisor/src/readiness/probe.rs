//! Active HTTP reachability probing.

use crate::SupervisorResult;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

/// Something that can tell whether the backend accepts requests yet.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// GET on the backend root.
///
/// Both 200 and 404 count as reachable since a 404 still proves the
/// listener is accepting connections. Anything else, including a refused
/// connection or a timeout, is "not yet".
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(host: &str, port: u16, timeout: Duration) -> SupervisorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self {
            client,
            url: format!("http://{host}:{port}/"),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(resp) => {
                let status = resp.status();
                debug!("Probe {} answered HTTP {status}", self.url);
                status == StatusCode::OK || status == StatusCode::NOT_FOUND
            }
            Err(e) => {
                debug!("Probe {} failed: {e}", self.url);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable { attempt: u32 },
    Exhausted { attempts: u32 },
}

/// Fixed-interval retry loop around a probe.
#[derive(Clone)]
pub struct ProbePolicy {
    probe: Arc<dyn ReadinessProbe>,
    interval: Duration,
    budget: u32,
}

impl ProbePolicy {
    pub fn new(probe: Arc<dyn ReadinessProbe>, interval: Duration, budget: u32) -> Self {
        Self {
            probe,
            interval,
            budget,
        }
    }

    pub async fn poll_until_reachable(&self) -> ProbeOutcome {
        for attempt in 1..=self.budget {
            if self.probe.is_reachable().await {
                return ProbeOutcome::Reachable { attempt };
            }
            if attempt < self.budget {
                tokio::time::sleep(self.interval).await;
            }
        }

        ProbeOutcome::Exhausted {
            attempts: self.budget,
        }
    }
}

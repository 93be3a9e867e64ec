//! Reachability probes.
//!
//! Two booleans decide routing: is the local model service up, and is the
//! device online. Probes never fail. Local errors fold into `false`; for the
//! network, only a name that does not exist means offline.
//!
//! Production code uses `RealReachabilityProbe`. Tests use
//! `FakeReachabilityProbe` with fixed answers.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{LocalConfig, ProbeConfig};

/// Probe results for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Reachability {
    /// Local model service answered its liveness check
    pub local: bool,
    /// External network (DNS) is reachable
    pub network: bool,
}

impl Reachability {
    pub fn new(local: bool, network: bool) -> Self {
        Self { local, network }
    }
}

// ============================================================================
// Probe Trait
// ============================================================================

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Short-timeout liveness check of the local backend
    async fn probe_local(&self) -> bool;

    /// DNS check against a well-known external host
    async fn probe_remote(&self) -> bool;

    /// Run both probes concurrently and wait for both
    async fn probe_all(&self) -> Reachability {
        let (local, network) = tokio::join!(self.probe_local(), self.probe_remote());
        Reachability { local, network }
    }
}

// ============================================================================
// Real Probe (Production)
// ============================================================================

pub struct RealReachabilityProbe {
    http: reqwest::Client,
    local_url: String,
    dns_host: String,
    dns_port: u16,
    dns_timeout: Duration,
}

impl RealReachabilityProbe {
    pub fn new(local: &LocalConfig, probe: &ProbeConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(local.probe_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            local_url: local.base_url.clone(),
            dns_host: probe.dns_host.clone(),
            dns_port: probe.dns_port,
            dns_timeout: Duration::from_millis(probe.dns_timeout_ms),
        })
    }
}

#[async_trait]
impl ReachabilityProbe for RealReachabilityProbe {
    async fn probe_local(&self) -> bool {
        match self.http.get(&self.local_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("Local backend is up at {}", self.local_url);
                true
            }
            Ok(resp) => {
                info!("Local backend answered {} at {}", resp.status(), self.local_url);
                false
            }
            Err(e) => {
                info!("Local backend not reachable at {}: {}", self.local_url, e);
                false
            }
        }
    }

    async fn probe_remote(&self) -> bool {
        let lookup = tokio::net::lookup_host((self.dns_host.as_str(), self.dns_port));
        match tokio::time::timeout(self.dns_timeout, lookup).await {
            Ok(Ok(mut addrs)) => {
                let online = addrs.next().is_some();
                if online {
                    debug!("Resolved {}, device is online", self.dns_host);
                } else {
                    info!("{} resolved to no addresses, device is offline", self.dns_host);
                }
                online
            }
            Ok(Err(e)) if is_not_found(&e) => {
                info!("Could not resolve {}, device is offline: {}", self.dns_host, e);
                false
            }
            Ok(Err(e)) => {
                warn!(
                    "DNS lookup of {} failed ({}), assuming online",
                    self.dns_host, e
                );
                true
            }
            Err(_) => {
                // A slow resolver is not a failed one
                warn!(
                    "DNS lookup of {} exceeded {:?}, assuming online",
                    self.dns_host, self.dns_timeout
                );
                true
            }
        }
    }
}

/// Resolver messages that mean the name does not exist. A temporary
/// resolver failure does not count as offline.
const NOT_FOUND_MESSAGES: &[&str] = &[
    "name or service not known",
    "no address associated with hostname",
    "nodename nor servname provided",
    "no such host is known",
];

/// Whether a lookup error means the host could not be found
pub fn is_not_found(err: &std::io::Error) -> bool {
    if err.kind() == std::io::ErrorKind::NotFound {
        return true;
    }
    let message = err.to_string().to_lowercase();
    NOT_FOUND_MESSAGES.iter().any(|m| message.contains(m))
}

// ============================================================================
// Fake Probe (Testing)
// ============================================================================

/// Fixed probe answers with call counting
pub struct FakeReachabilityProbe {
    reachability: Reachability,
    local_calls: Mutex<usize>,
    remote_calls: Mutex<usize>,
}

impl FakeReachabilityProbe {
    pub fn new(local: bool, network: bool) -> Self {
        Self {
            reachability: Reachability::new(local, network),
            local_calls: Mutex::new(0),
            remote_calls: Mutex::new(0),
        }
    }

    /// Everything reachable
    pub fn online() -> Self {
        Self::new(true, true)
    }

    /// Nothing reachable
    pub fn offline() -> Self {
        Self::new(false, false)
    }

    pub fn local_calls(&self) -> usize {
        *self.local_calls.lock().unwrap()
    }

    pub fn remote_calls(&self) -> usize {
        *self.remote_calls.lock().unwrap()
    }
}

#[async_trait]
impl ReachabilityProbe for FakeReachabilityProbe {
    async fn probe_local(&self) -> bool {
        *self.local_calls.lock().unwrap() += 1;
        self.reachability.local
    }

    async fn probe_remote(&self) -> bool {
        *self.remote_calls.lock().unwrap() += 1;
        self.reachability.network
    }
}

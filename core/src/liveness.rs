//! # Liveness Validation
//!
//! Decides whether the endpoints advertised for a client actually exist.
//!
//! * SSH-style fields (`user@host`) pass when `host` resolves.
//! * API-style fields pass when an HTTPS `HEAD` to `https://<host>` answers
//!   with an accepted status (see [`is_live_status`]). There is no plain
//!   HTTP fallback.
//!
//! A record is valid only if every populated field passes. All lookups and
//! probes of one [`LivenessValidator`] share a single semaphore, so the total
//! number of in-flight network checks never exceeds the configured bound.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use carto_common::clients::{ClientRecord, EndpointKind};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

mod prober;
mod resolver;

pub use prober::{EndpointProber, HttpsProber};
pub use resolver::{HostResolver, SystemResolver};

#[derive(Debug, Error)]
pub enum LivenessError {
    #[error("{label} validation failed: endpoint '{value}' has no host")]
    InvalidEndpoint { label: &'static str, value: String },

    #[error("{label} validation failed: cannot resolve '{host}': {reason}")]
    Dns {
        label: &'static str,
        host: String,
        reason: String,
    },

    #[error("{label} validation failed: lookup of '{host}' timed out after {after:?}")]
    DnsTimeout {
        label: &'static str,
        host: String,
        after: Duration,
    },

    #[error("{label} validation failed: request to '{url}' failed: {reason}")]
    Probe {
        label: &'static str,
        url: String,
        reason: String,
    },

    #[error("{label} validation failed: request to '{url}' timed out after {after:?}")]
    ProbeTimeout {
        label: &'static str,
        url: String,
        after: Duration,
    },

    #[error("{label} validation failed: '{url}' answered with status {status}")]
    Status {
        label: &'static str,
        url: String,
        status: u16,
    },

    #[error("{label} validation worker stopped unexpectedly")]
    Worker { label: &'static str },

    #[error("validation cancelled")]
    Cancelled,
}

impl LivenessError {
    /// Label of the endpoint field that failed, if any.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            LivenessError::InvalidEndpoint { label, .. }
            | LivenessError::Dns { label, .. }
            | LivenessError::DnsTimeout { label, .. }
            | LivenessError::Probe { label, .. }
            | LivenessError::ProbeTimeout { label, .. }
            | LivenessError::Status { label, .. }
            | LivenessError::Worker { label } => Some(*label),
            LivenessError::Cancelled => None,
        }
    }
}

/// Statuses that prove an HTTPS endpoint exists.
///
/// Everything in `200..400` plus the "exists but refuses this request"
/// family: 401, 404 and 405.
pub fn is_live_status(status: u16) -> bool {
    (200..400).contains(&status) || matches!(status, 401 | 404 | 405)
}

#[derive(Clone)]
pub struct LivenessValidator {
    limiter: Arc<Semaphore>,
    dns_timeout: Duration,
    http_timeout: Duration,
    resolver: Arc<dyn HostResolver>,
    prober: Arc<dyn EndpointProber>,
}

impl LivenessValidator {
    /// Creates a validator backed by the system resolver and an HTTPS
    /// prober. HTTP probes get twice the DNS timeout.
    pub fn new(dns_timeout: Duration, max_concurrent: usize) -> anyhow::Result<Self> {
        let http_timeout = dns_timeout * 2;
        Ok(Self {
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            dns_timeout,
            http_timeout,
            resolver: Arc::new(SystemResolver),
            prober: Arc::new(HttpsProber::new(http_timeout)?),
        })
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_prober(mut self, prober: Arc<dyn EndpointProber>) -> Self {
        self.prober = prober;
        self
    }

    /// Free limiter slots, equal to the configured bound when idle.
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Validates every populated endpoint of `record`.
    ///
    /// Fields are checked concurrently and the first failure is returned,
    /// aborting the remaining checks. Empty fields are skipped, so a record
    /// without endpoints is valid.
    pub async fn validate_client(
        &self,
        cancel: &CancellationToken,
        record: &ClientRecord,
    ) -> Result<(), LivenessError> {
        let mut workers: JoinSet<Result<(), LivenessError>> = JoinSet::new();
        let mut labels: HashMap<task::Id, &'static str> = HashMap::new();

        for endpoint in record.endpoints() {
            let this = self.clone();
            let cancel = cancel.clone();
            let value = endpoint.value.trim().to_string();
            let (label, kind) = (endpoint.label, endpoint.kind);

            let handle = workers.spawn(async move { this.check(&cancel, label, kind, &value).await });
            labels.insert(handle.id(), label);
        }

        while let Some(joined) = workers.join_next_with_id().await {
            let outcome = match joined {
                Ok((_, outcome)) => outcome,
                Err(e) => Err(LivenessError::Worker {
                    label: labels.get(&e.id()).copied().unwrap_or("endpoint"),
                }),
            };

            if let Err(e) = outcome {
                workers.abort_all();
                debug!(client = %record.client_name, error = %e, "client failed liveness");
                return Err(e);
            }
        }

        Ok(())
    }

    async fn check(
        &self,
        cancel: &CancellationToken,
        label: &'static str,
        kind: EndpointKind,
        value: &str,
    ) -> Result<(), LivenessError> {
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Err(LivenessError::Cancelled),
            permit = self.limiter.clone().acquire_owned() => {
                permit.map_err(|_| LivenessError::Cancelled)?
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(LivenessError::Cancelled),
            outcome = self.check_endpoint(label, kind, value) => outcome,
        }
    }

    async fn check_endpoint(
        &self,
        label: &'static str,
        kind: EndpointKind,
        value: &str,
    ) -> Result<(), LivenessError> {
        let host = match kind {
            EndpointKind::Ssh => ssh_host(value),
            EndpointKind::Api => api_host(value),
        }
        .ok_or_else(|| LivenessError::InvalidEndpoint {
            label,
            value: value.to_string(),
        })?;

        match kind {
            EndpointKind::Ssh => self.resolve(label, host).await.map(|_| ()),
            EndpointKind::Api => self.probe(label, host).await,
        }
    }

    async fn resolve(&self, label: &'static str, host: &str) -> Result<Vec<IpAddr>, LivenessError> {
        match timeout(self.dns_timeout, self.resolver.resolve(host)).await {
            Ok(Ok(addrs)) if addrs.is_empty() => Err(LivenessError::Dns {
                label,
                host: host.to_string(),
                reason: "no addresses returned".to_string(),
            }),
            Ok(Ok(addrs)) => Ok(addrs),
            Ok(Err(e)) => Err(LivenessError::Dns {
                label,
                host: host.to_string(),
                reason: e.to_string(),
            }),
            Err(_elapsed) => Err(LivenessError::DnsTimeout {
                label,
                host: host.to_string(),
                after: self.dns_timeout,
            }),
        }
    }

    async fn probe(&self, label: &'static str, host: &str) -> Result<(), LivenessError> {
        let url = format!("https://{host}");

        let status = match timeout(self.http_timeout, self.prober.head(&url)).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(LivenessError::Probe {
                    label,
                    url,
                    reason: e.to_string(),
                });
            }
            Err(_elapsed) => {
                return Err(LivenessError::ProbeTimeout {
                    label,
                    url,
                    after: self.http_timeout,
                });
            }
        };

        if !is_live_status(status) {
            return Err(LivenessError::Status { label, url, status });
        }
        Ok(())
    }
}

/// Host part of `user@host`, or the whole value when there is no user.
fn ssh_host(value: &str) -> Option<&str> {
    let host = value.rsplit_once('@').map_or(value, |(_, host)| host).trim();
    (!host.is_empty()).then_some(host)
}

/// Host of an API endpoint given either as a bare host or as a URL.
fn api_host(value: &str) -> Option<&str> {
    let without_scheme = value
        .split_once("://")
        .map_or(value, |(_, rest)| rest);
    let authority = without_scheme.split('/').next().unwrap_or_default();
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host)
        .trim();
    (!host.is_empty()).then_some(host)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

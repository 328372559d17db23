//! In-memory collaborators shared by the integration tests.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use carto_common::config::DiscoveryConfig;
use carto_common::network::{NetworkRecord, NetworkStatus};
use carto_common::sources::SourceAdapter;
use carto_core::ranges::DocumentFetcher;
use tokio_util::sync::CancellationToken;

/// Returns the same records every cycle after an optional delay.
pub struct FixedSource {
    pub name: &'static str,
    pub networks: Vec<NetworkRecord>,
    pub delay: Duration,
}

impl FixedSource {
    pub fn new(name: &'static str, networks: &[&str]) -> Self {
        let networks = networks
            .iter()
            .map(|n| {
                let mut record = NetworkRecord::new(*n, NetworkStatus::Active);
                record.description = Some(format!("from {name}"));
                record
            })
            .collect();
        Self {
            name,
            networks,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl SourceAdapter for FixedSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn discover(
        &self,
        _cancel: &CancellationToken,
        _config: &DiscoveryConfig,
    ) -> anyhow::Result<BTreeMap<String, NetworkRecord>> {
        tokio::time::sleep(self.delay).await;
        Ok(self
            .networks
            .iter()
            .map(|r| (r.name.clone(), r.clone()))
            .collect())
    }
}

/// Always fails.
pub struct FailingSource;

#[async_trait]
impl SourceAdapter for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn discover(
        &self,
        _cancel: &CancellationToken,
        _config: &DiscoveryConfig,
    ) -> anyhow::Result<BTreeMap<String, NetworkRecord>> {
        anyhow::bail!("upstream unavailable")
    }
}

/// Serves documents from a fixed URL map, anything else is a 404.
#[derive(Default)]
pub struct CannedFetcher {
    documents: BTreeMap<String, String>,
}

impl CannedFetcher {
    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.documents.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl DocumentFetcher for CannedFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        match self.documents.get(url) {
            Some(body) => Ok(body.clone().into_bytes()),
            None => anyhow::bail!("{url} returned status 404 Not Found"),
        }
    }
}

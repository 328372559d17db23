use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use carto_protocols::dora::{self, ConsensusClient, ExecutionClient};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Client-listing API of a network explorer.
#[async_trait]
pub trait ClientApi: Send + Sync {
    /// Fails unless the consensus listing answers `200`.
    async fn check_health(&self, cancel: &CancellationToken, base: &str) -> anyhow::Result<()>;

    async fn consensus_clients(
        &self,
        cancel: &CancellationToken,
        base: &str,
    ) -> anyhow::Result<Vec<ConsensusClient>>;

    async fn execution_clients(
        &self,
        cancel: &CancellationToken,
        base: &str,
    ) -> anyhow::Result<Vec<ExecutionClient>>;
}

/// HTTP implementation of [`ClientApi`].
pub struct DoraClient {
    client: reqwest::Client,
    health: reqwest::Client,
    attempts: usize,
}

impl DoraClient {
    pub fn new(health_timeout: Duration, attempts: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build client api http client")?;
        let health = reqwest::Client::builder()
            .timeout(health_timeout)
            .build()
            .context("failed to build health check http client")?;

        Ok(Self {
            client,
            health,
            attempts: attempts.max(1),
        })
    }

    async fn fetch_once(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            bail!("unexpected status {}", response.status());
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// GETs `url`, backing off 1s, 2s, 4s... between attempts.
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> anyhow::Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            if attempt >= self.attempts {
                return Err(error.context(format!("{url} failed after {attempt} attempts")));
            }

            let backoff = Duration::from_secs(1 << (attempt - 1).min(5));
            warn!(url, attempt, ?backoff, error = %error, "client api request failed, retrying");

            tokio::select! {
                _ = cancel.cancelled() => bail!("request to {url} cancelled"),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }
}

#[async_trait]
impl ClientApi for DoraClient {
    async fn check_health(&self, cancel: &CancellationToken, base: &str) -> anyhow::Result<()> {
        let url = dora::endpoint(base, dora::CONSENSUS_CLIENTS_PATH);

        let probe = async {
            let head = self.health.head(&url).send().await;
            match head {
                Ok(response) if response.status() == StatusCode::OK => Ok(StatusCode::OK),
                _ => self.health.get(&url).send().await.map(|r| r.status()),
            }
        };

        let status = tokio::select! {
            _ = cancel.cancelled() => bail!("health check of {base} cancelled"),
            status = probe => status.with_context(|| format!("health check of {base} failed"))?,
        };

        if status != StatusCode::OK {
            bail!("client api of {base} not available (status {status})");
        }
        debug!(url = %base, "client api health check passed");
        Ok(())
    }

    async fn consensus_clients(
        &self,
        cancel: &CancellationToken,
        base: &str,
    ) -> anyhow::Result<Vec<ConsensusClient>> {
        let url = dora::endpoint(base, dora::CONSENSUS_CLIENTS_PATH);
        let body = self.fetch(cancel, &url).await?;
        let clients = dora::decode_consensus(&body).context("invalid consensus client listing")?;
        debug!(url = %url, clients = clients.len(), "fetched consensus clients");
        Ok(clients)
    }

    async fn execution_clients(
        &self,
        cancel: &CancellationToken,
        base: &str,
    ) -> anyhow::Result<Vec<ExecutionClient>> {
        let url = dora::endpoint(base, dora::EXECUTION_CLIENTS_PATH);
        let body = self.fetch(cancel, &url).await?;
        let clients = dora::decode_execution(&body).context("invalid execution client listing")?;
        debug!(url = %url, clients = clients.len(), "fetched execution clients");
        Ok(clients)
    }
}

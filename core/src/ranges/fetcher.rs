use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RangeFetchError {
    #[error("no inventory document could be fetched from {0} candidate urls")]
    NoDocuments(usize),

    #[error("none of the fetched inventory documents could be parsed")]
    NoValidDocuments,
}

/// Retrieves a raw inventory document.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build inventory http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        if response.status() != StatusCode::OK {
            bail!("{url} returned status {}", response.status());
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;
        Ok(body.to_vec())
    }
}

/// Fetches every candidate and keeps the ones that answered.
///
/// Returns the documents paired with the URL they came from, in candidate
/// order. Fails only when no candidate succeeded.
pub async fn fetch_multiple(
    fetcher: &dyn DocumentFetcher,
    urls: &[String],
) -> Result<Vec<(String, Vec<u8>)>, RangeFetchError> {
    let mut documents = Vec::with_capacity(urls.len());

    for url in urls {
        match fetcher.fetch(url).await {
            Ok(body) => {
                debug!(url = %url, bytes = body.len(), "fetched inventory document");
                documents.push((url.clone(), body));
            }
            Err(e) => warn!(url = %url, error = %e, "failed to fetch inventory document"),
        }
    }

    if documents.is_empty() {
        return Err(RangeFetchError::NoDocuments(urls.len()));
    }
    Ok(documents)
}

/// Removes the first configured prefix the network name starts with.
pub fn inventory_name<'a>(network: &'a str, prefixes: &[String]) -> &'a str {
    prefixes
        .iter()
        .find_map(|p| network.strip_prefix(p.as_str()))
        .unwrap_or(network)
}

/// Expands `{repo}` and `{network}` in every template.
pub fn inventory_urls(templates: &[String], repository: &str, network: &str) -> Vec<String> {
    templates
        .iter()
        .map(|t| t.replace("{repo}", repository).replace("{network}", network))
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

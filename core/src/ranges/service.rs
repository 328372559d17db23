use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Context;
use carto_common::config::{RangesConfig, SourceConfig};
use carto_common::network::NetworkRecord;
use carto_common::ranges::RangeSet;
use carto_common::storage::{CONTENT_TYPE_JSON, ObjectStore, keys};
use carto_common::{error, info, success, warn};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::aggregator::aggregate;
use super::fetcher::{self, DocumentFetcher, RangeFetchError};
use super::parser::RangeParser;

/// Outcome of one network in a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkOutcome {
    Published,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeReport {
    pub published: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Builds and publishes the validator range artifact of every network.
#[derive(Clone)]
pub struct RangeService {
    parser: RangeParser,
    fetcher: Arc<dyn DocumentFetcher>,
    store: Arc<dyn ObjectStore>,
    config: Arc<RangesConfig>,
}

impl RangeService {
    pub fn new(
        parser: RangeParser,
        fetcher: Arc<dyn DocumentFetcher>,
        store: Arc<dyn ObjectStore>,
        config: RangesConfig,
    ) -> Self {
        Self {
            parser,
            fetcher,
            store,
            config: Arc::new(config),
        }
    }

    /// Processes every network with bounded concurrency.
    ///
    /// A failing network never affects the others. Only cancellation aborts
    /// the run as a whole.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        networks: &BTreeMap<String, NetworkRecord>,
    ) -> anyhow::Result<RangeReport> {
        let limiter = Arc::new(Semaphore::new(self.config.max_concurrent_networks.max(1)));
        let mut workers: JoinSet<(String, NetworkOutcome)> = JoinSet::new();
        let mut names: HashMap<task::Id, String> = HashMap::new();

        for (name, record) in networks {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => anyhow::bail!("validator range generation cancelled"),
                permit = limiter.clone().acquire_owned() => permit?,
            };

            let service = self.clone();
            let task_name = name.clone();
            let record = record.clone();
            let cancel = cancel.clone();

            let handle = workers.spawn(async move {
                let _permit = permit;
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => NetworkOutcome::Failed,
                    result = service.process_network(&task_name, &record) => match result {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(network = %task_name, error = format!("{e:#}"), "failed to generate validator ranges");
                            NetworkOutcome::Failed
                        }
                    },
                };
                (task_name, outcome)
            });
            names.insert(handle.id(), name.clone());
        }

        let mut report = RangeReport::default();
        while let Some(joined) = workers.join_next_with_id().await {
            let (name, outcome) = match joined {
                Ok((_, finished)) => finished,
                Err(e) => {
                    let name = names.remove(&e.id()).unwrap_or_default();
                    error!(network = %name, error = %e, "validator range worker stopped unexpectedly");
                    (name, NetworkOutcome::Failed)
                }
            };
            match outcome {
                NetworkOutcome::Published => report.published.push(name),
                NetworkOutcome::Skipped => report.skipped.push(name),
                NetworkOutcome::Failed => report.failed.push(name),
            }
        }

        if cancel.is_cancelled() {
            anyhow::bail!("validator range generation cancelled");
        }

        report.published.sort();
        report.skipped.sort();
        report.failed.sort();
        Ok(report)
    }

    /// Builds and uploads the artifact of one network.
    pub async fn process_network(
        &self,
        name: &str,
        record: &NetworkRecord,
    ) -> anyhow::Result<NetworkOutcome> {
        let mut sets: Vec<RangeSet> = Vec::new();

        match self.primary_ranges(name, record).await {
            Ok(set) => sets.push(set),
            Err(e) => warn!(network = %name, error = %e, "no ranges from the network repository"),
        }

        sets.extend(self.additional_ranges(name).await);

        if sets.is_empty() {
            info!(network = %name, "no validator ranges found, skipping");
            return Ok(NetworkOutcome::Skipped);
        }

        let mut merged = aggregate(&sets);
        merged.metadata.network_name = name.to_string();

        let body = serde_json::to_vec_pretty(&merged).context("failed to encode validator ranges")?;
        self.store
            .upload(&keys::validator_ranges(name), body, CONTENT_TYPE_JSON)
            .await
            .with_context(|| format!("failed to upload validator ranges for {name}"))?;

        success!(
            network = %name,
            validators = merged.validators.total_count,
            nodes = merged.nodes.len(),
            "published validator ranges"
        );
        Ok(NetworkOutcome::Published)
    }

    async fn primary_ranges(
        &self,
        name: &str,
        record: &NetworkRecord,
    ) -> Result<RangeSet, RangeFetchError> {
        let repository = record
            .repository
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.config.default_repository);
        let inventory = fetcher::inventory_name(name, &self.config.strip_prefixes);
        let urls = fetcher::inventory_urls(&self.config.inventory_url_templates, repository, inventory);

        let documents = fetcher::fetch_multiple(self.fetcher.as_ref(), &urls).await?;

        let sets: Vec<RangeSet> = documents
            .iter()
            .filter_map(|(url, body)| {
                self.parse_document(name, url, body, &self.config.source_name, 0)
            })
            .collect();

        if sets.is_empty() {
            return Err(RangeFetchError::NoValidDocuments);
        }
        Ok(aggregate(&sets))
    }

    async fn additional_ranges(&self, name: &str) -> Vec<RangeSet> {
        let Some(sources) = self.config.additional_sources.get(name) else {
            return Vec::new();
        };

        let mut sets = Vec::with_capacity(sources.len());
        for SourceConfig { url, name: source, range_offset } in sources {
            let body = match self.fetcher.fetch(url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(network = %name, source = %source, url = %url, error = %e, "failed to fetch additional source");
                    continue;
                }
            };
            if let Some(set) = self.parse_document(name, url, &body, source, *range_offset) {
                debug!(network = %name, source = %source, nodes = set.nodes.len(), "parsed additional source");
                sets.push(set);
            }
        }
        sets
    }

    fn parse_document(
        &self,
        network: &str,
        url: &str,
        body: &[u8],
        source: &str,
        offset: u64,
    ) -> Option<RangeSet> {
        let text = String::from_utf8_lossy(body);
        match self.parser.parse(&text, url, source, offset) {
            Ok(set) => Some(set),
            Err(e) => {
                warn!(network = %network, url = %url, error = %e, "failed to parse inventory document");
                None
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

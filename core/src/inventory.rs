//! # Client Inventory
//!
//! Publishes, per network, the client instances its explorer reports as
//! running. Only networks that are active, belong to a repository and expose
//! an explorer endpoint are considered. When validation is enabled every
//! client must pass the [`LivenessValidator`] to be published.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use carto_common::clients::{ClientRecord, InventoryData, Validation};
use carto_common::config::InventoryConfig;
use carto_common::network::{DiscoveryResult, NetworkRecord, NetworkStatus};
use carto_common::registry::ClientRegistry;
use carto_common::storage::{CONTENT_TYPE_JSON, ObjectStore, keys};
use carto_common::{debug, error, info, success, warn};
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::liveness::LivenessValidator;

pub mod client_api;
pub mod generator;

pub use client_api::{ClientApi, DoraClient};

/// Service key of the explorer that lists running clients.
const EXPLORER_SERVICE: &str = "dora";

pub struct InventoryService {
    api: Arc<dyn ClientApi>,
    store: Arc<dyn ObjectStore>,
    registry: Arc<ClientRegistry>,
    validator: Option<LivenessValidator>,
    max_concurrent_networks: usize,
    snapshot_key: String,
}

impl InventoryService {
    pub fn new(
        api: Arc<dyn ClientApi>,
        store: Arc<dyn ObjectStore>,
        registry: Arc<ClientRegistry>,
        config: &InventoryConfig,
    ) -> anyhow::Result<Self> {
        let validation = &config.validation;
        let validator = validation
            .enabled
            .then(|| {
                LivenessValidator::new(validation.dns_timeout(), validation.max_concurrent_validations)
            })
            .transpose()?;

        Ok(Self {
            api,
            store,
            registry,
            validator,
            max_concurrent_networks: config.max_concurrent_networks.max(1),
            snapshot_key: keys::NETWORKS.to_string(),
        })
    }

    /// Reads the network snapshot from `key` instead of the default key.
    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    /// Replaces the liveness validator, `None` disables validation.
    pub fn with_validator(mut self, validator: Option<LivenessValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Networks eligible for an inventory.
    pub fn select(networks: &BTreeMap<String, NetworkRecord>) -> BTreeMap<String, NetworkRecord> {
        networks
            .iter()
            .filter(|(name, record)| {
                let has_repository = record.repository.as_deref().is_some_and(|r| !r.is_empty());
                if !has_repository {
                    debug!(network = %name, "skipping network without repository");
                }
                has_repository
                    && record.status == NetworkStatus::Active
                    && record.service(EXPLORER_SERVICE).is_some_and(|u| !u.is_empty())
            })
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect()
    }

    /// Generates and uploads the inventory of every eligible network.
    ///
    /// Returns the names of the published networks. Every upload is
    /// attempted; the first upload error is returned afterwards.
    pub async fn run(&self, cancel: &CancellationToken) -> anyhow::Result<Vec<String>> {
        let raw = self
            .store
            .download(&self.snapshot_key)
            .await
            .context("failed to download network snapshot")?;
        let snapshot: DiscoveryResult =
            serde_json::from_slice(&raw).context("failed to parse network snapshot")?;

        let networks = Self::select(&snapshot.networks);
        info!(
            networks = networks.len(),
            skipped = snapshot.networks.len() - networks.len(),
            "selected networks for inventory generation"
        );

        let inventories = self.generate_all(cancel, networks).await?;
        self.upload_all(inventories).await
    }

    async fn generate_all(
        &self,
        cancel: &CancellationToken,
        networks: BTreeMap<String, NetworkRecord>,
    ) -> anyhow::Result<BTreeMap<String, InventoryData>> {
        let limiter = Arc::new(Semaphore::new(self.max_concurrent_networks));
        let mut workers = JoinSet::new();

        for (name, record) in networks {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => anyhow::bail!("inventory generation cancelled"),
                permit = limiter.clone().acquire_owned() => permit?,
            };

            let job = self.job();
            let cancel = cancel.clone();
            workers.spawn(async move {
                let _permit = permit;
                let outcome = job.generate(&cancel, &name, &record).await;
                (name, outcome)
            });
        }

        let mut inventories = BTreeMap::new();
        let mut failures = 0;
        while let Some(joined) = workers.join_next().await {
            let (name, outcome) = joined.context("inventory worker panicked")?;
            match outcome {
                Ok(Some(inventory)) => {
                    inventories.insert(name, inventory);
                }
                Ok(None) => debug!(network = %name, "no inventory generated"),
                Err(e) => {
                    failures += 1;
                    error!(network = %name, error = format!("{e:#}"), "failed to generate inventory");
                }
            }
        }

        if cancel.is_cancelled() {
            anyhow::bail!("inventory generation cancelled");
        }

        info!(generated = inventories.len(), failures, "inventory generation finished");
        Ok(inventories)
    }

    async fn upload_all(&self, inventories: BTreeMap<String, InventoryData>) -> anyhow::Result<Vec<String>> {
        let mut uploads = JoinSet::new();

        for (name, inventory) in inventories {
            let store = Arc::clone(&self.store);
            uploads.spawn(async move {
                let outcome = async {
                    let body = serde_json::to_vec_pretty(&inventory)
                        .with_context(|| format!("failed to encode inventory for {name}"))?;
                    store
                        .upload(&keys::inventory(&name), body, CONTENT_TYPE_JSON)
                        .await
                        .with_context(|| format!("failed to upload inventory for {name}"))
                }
                .await;
                (name, outcome)
            });
        }

        let mut published = Vec::new();
        let mut first_error: Option<anyhow::Error> = None;

        while let Some(joined) = uploads.join_next().await {
            let (name, outcome) = joined.context("inventory upload task panicked")?;
            match outcome {
                Ok(()) => {
                    debug!(network = %name, "uploaded inventory");
                    published.push(name);
                }
                Err(e) => {
                    error!(network = %name, error = format!("{e:#}"), "inventory upload failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        published.sort();
        success!(inventories = published.len(), "published client inventories");
        Ok(published)
    }

    fn job(&self) -> Job {
        Job {
            api: Arc::clone(&self.api),
            registry: Arc::clone(&self.registry),
            validator: self.validator.clone(),
        }
    }
}

/// The per-network part of the service, owned by one worker task.
struct Job {
    api: Arc<dyn ClientApi>,
    registry: Arc<ClientRegistry>,
    validator: Option<LivenessValidator>,
}

impl Job {
    async fn generate(
        &self,
        cancel: &CancellationToken,
        name: &str,
        record: &NetworkRecord,
    ) -> anyhow::Result<Option<InventoryData>> {
        let Some(base) = record.service(EXPLORER_SERVICE) else {
            return Ok(None);
        };

        if let Err(e) = self.api.check_health(cancel, base).await {
            warn!(network = %name, url = %base, error = format!("{e:#}"), "client api unavailable, skipping");
            return Ok(None);
        }

        let (consensus, execution) = tokio::try_join!(
            async {
                self.api
                    .consensus_clients(cancel, base)
                    .await
                    .context("failed to fetch consensus clients")
            },
            async {
                self.api
                    .execution_clients(cancel, base)
                    .await
                    .context("failed to fetch execution clients")
            },
        )?;

        let self_hosted = record.self_hosted_dns;
        let consensus: Vec<ClientRecord> = consensus
            .iter()
            .map(|c| generator::consensus_record(&self.registry, c, name, self_hosted))
            .collect();
        let execution: Vec<ClientRecord> = execution
            .iter()
            .map(|c| generator::execution_record(&self.registry, c, name, self_hosted))
            .collect();

        let consensus_clients = self.gate(cancel, name, consensus).await;
        let execution_clients = self.gate(cancel, name, execution).await;

        info!(
            network = %name,
            consensus_clients = consensus_clients.len(),
            execution_clients = execution_clients.len(),
            "generated inventory"
        );

        Ok(Some(InventoryData {
            network: name.to_string(),
            repository: record.repository.clone().unwrap_or_default(),
            last_updated: Utc::now(),
            consensus_clients,
            execution_clients,
        }))
    }

    /// Keeps the clients that pass liveness validation, in input order.
    async fn gate(
        &self,
        cancel: &CancellationToken,
        network: &str,
        records: Vec<ClientRecord>,
    ) -> Vec<ClientRecord> {
        let Some(validator) = &self.validator else {
            return records
                .into_iter()
                .map(|mut r| {
                    r.validation = Some(Validation::Skipped);
                    r
                })
                .collect();
        };

        let mut checks = JoinSet::new();
        for (index, record) in records.iter().enumerate() {
            let validator = validator.clone();
            let cancel = cancel.clone();
            let record = record.clone();
            checks.spawn(async move { (index, validator.validate_client(&cancel, &record).await) });
        }

        let mut passed = vec![false; records.len()];
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok((index, Ok(()))) => passed[index] = true,
                Ok((index, Err(e))) => warn!(
                    network = %network,
                    client = %records[index].client_name,
                    error = %e,
                    "client failed liveness validation, dropping"
                ),
                Err(e) => error!(network = %network, error = %e, "liveness task failed"),
            }
        }

        records
            .into_iter()
            .zip(passed)
            .filter_map(|(mut record, ok)| {
                ok.then(|| {
                    record.validation = Some(Validation::Passed);
                    record
                })
            })
            .collect()
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

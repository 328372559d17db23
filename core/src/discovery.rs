//! # Network Discovery Service
//!
//! Runs discovery cycles over every registered [`SourceAdapter`].
//!
//! Adapters run concurrently and post their contribution to a single
//! collector. Contributions are merged in registration order: the first
//! adapter registered owns a network name, later duplicates are dropped and
//! logged. A failing adapter only loses its own contribution.
//!
//! In scheduled mode ([`DiscoveryService::start`]) cycles are handed to the
//! registered [`ResultHandler`]s on a separate processor task, so a slow
//! handler never delays the next cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use carto_common::config::DiscoveryConfig;
use carto_common::network::{DiscoveryResult, NetworkRecord, ProviderInfo};
use carto_common::registry::ClientRegistry;
use carto_common::sources::SourceAdapter;
use carto_common::{debug, error, info, success, warn};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub mod handler;
mod metadata;

pub use handler::{ResultHandler, SnapshotPublisher};

/// Capacity of the queue between the scheduler and the handler processor.
const RESULT_QUEUE: usize = 10;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery cancelled")]
    Cancelled,

    #[error("discovery tasks did not stop within {0:?}")]
    ShutdownTimeout(Duration),
}

type Contribution = (usize, String, anyhow::Result<BTreeMap<String, NetworkRecord>>);

/// Everything one cycle needs, detached from the service so it can move
/// into the scheduler task.
#[derive(Clone)]
struct Cycle {
    config: Arc<DiscoveryConfig>,
    registry: Arc<ClientRegistry>,
    sources: Arc<[Arc<dyn SourceAdapter>]>,
}

impl Cycle {
    async fn run(&self, cancel: &CancellationToken) -> Result<DiscoveryResult, DiscoveryError> {
        let started = Instant::now();
        let (tx, mut rx) = mpsc::channel::<Contribution>(self.sources.len().max(1));
        let mut workers = JoinSet::new();

        for (index, source) in self.sources.iter().enumerate() {
            let tx = tx.clone();
            let source = Arc::clone(source);
            let config = Arc::clone(&self.config);
            let cancel = cancel.clone();

            workers.spawn(async move {
                let outcome = source.discover(&cancel, &config).await;
                _ = tx.send((index, source.name().to_string(), outcome)).await;
            });
        }
        drop(tx);

        let mut contributions: Vec<Option<BTreeMap<String, NetworkRecord>>> =
            (0..self.sources.len()).map(|_| None).collect();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    workers.abort_all();
                    return Err(DiscoveryError::Cancelled);
                }
                message = rx.recv() => match message {
                    Some((index, name, Ok(networks))) => {
                        debug!(source = %name, networks = networks.len(), "source finished");
                        contributions[index] = Some(networks);
                    }
                    Some((_, name, Err(e))) => {
                        error!(source = %name, error = format!("{e:#}"), "source failed, continuing without it");
                    }
                    None => break,
                },
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "source task aborted");
            }
        }

        let networks = self.merge(contributions);
        let result = DiscoveryResult {
            network_metadata: metadata::repository_metadata(&self.config.repositories, &networks),
            clients: self.registry.profiles(),
            networks,
            last_update: Utc::now(),
            duration: started.elapsed().as_secs_f64(),
            providers: self
                .sources
                .iter()
                .map(|s| ProviderInfo {
                    name: s.name().to_string(),
                })
                .collect(),
        };

        success!(
            networks = result.networks.len(),
            duration = format!("{:.2}s", result.duration),
            "discovery cycle completed"
        );
        Ok(result)
    }

    /// Folds contributions in registration order, first owner wins.
    fn merge(
        &self,
        contributions: Vec<Option<BTreeMap<String, NetworkRecord>>>,
    ) -> BTreeMap<String, NetworkRecord> {
        let mut merged: BTreeMap<String, NetworkRecord> = BTreeMap::new();
        let mut owners: BTreeMap<String, &str> = BTreeMap::new();

        for (source, networks) in self.sources.iter().zip(contributions) {
            for (name, record) in networks.into_iter().flatten() {
                if let Some(owner) = owners.get(&name) {
                    warn!(
                        network = %name,
                        kept = %owner,
                        discarded = %source.name(),
                        "network reported by several sources, keeping first"
                    );
                    continue;
                }
                owners.insert(name.clone(), source.name());
                merged.insert(name, record);
            }
        }

        merged
    }
}

pub struct DiscoveryService {
    config: Arc<DiscoveryConfig>,
    registry: Arc<ClientRegistry>,
    sources: Vec<Arc<dyn SourceAdapter>>,
    handlers: Vec<Arc<dyn ResultHandler>>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl DiscoveryService {
    pub fn new(config: DiscoveryConfig, registry: Arc<ClientRegistry>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            sources: Vec::new(),
            handlers: Vec::new(),
            shutdown: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Adds a source. Registration order is merge priority.
    pub fn register_source(&mut self, source: Arc<dyn SourceAdapter>) {
        info!(source = %source.name(), "registered source");
        self.sources.push(source);
    }

    pub fn on_result(&mut self, handler: Arc<dyn ResultHandler>) {
        self.handlers.push(handler);
    }

    fn cycle(&self) -> Cycle {
        Cycle {
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            sources: self.sources.iter().cloned().collect(),
        }
    }

    /// Runs a single cycle and returns its result without invoking handlers.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<DiscoveryResult, DiscoveryError> {
        self.cycle().run(cancel).await
    }

    /// Starts the scheduler and the handler processor.
    ///
    /// The first cycle runs immediately, then once per configured interval.
    /// Both tasks stop when `cancel` fires or [`DiscoveryService::stop`] is
    /// called.
    pub fn start(&mut self, cancel: &CancellationToken) {
        self.shutdown = cancel.child_token();
        let (tx, rx) = mpsc::channel::<Arc<DiscoveryResult>>(RESULT_QUEUE);

        let processor = tokio::spawn(process_results(
            self.shutdown.clone(),
            rx,
            self.handlers.clone(),
        ));
        let scheduler = tokio::spawn(schedule(
            self.shutdown.clone(),
            self.cycle(),
            self.config.interval(),
            tx,
        ));

        info!(
            interval = ?self.config.interval(),
            sources = self.sources.len(),
            "discovery service started"
        );
        self.tasks = vec![scheduler, processor];
    }

    /// Cancels the background tasks and waits for them, at most `timeout`.
    pub async fn stop(&mut self, timeout: Duration) -> Result<(), DiscoveryError> {
        self.shutdown.cancel();
        let tasks = std::mem::take(&mut self.tasks);

        let joined = tokio::time::timeout(timeout, async {
            for task in tasks {
                if let Err(e) = task.await {
                    error!(error = %e, "discovery task failed");
                }
            }
        })
        .await;

        match joined {
            Ok(()) => {
                info!("discovery service stopped");
                Ok(())
            }
            Err(_) => Err(DiscoveryError::ShutdownTimeout(timeout)),
        }
    }
}

/// Fires immediately, then `period` after the previous tick was handled,
/// so a slow cycle never triggers a burst of catch-up cycles.
fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn schedule(
    shutdown: CancellationToken,
    cycle: Cycle,
    period: Duration,
    results: mpsc::Sender<Arc<DiscoveryResult>>,
) {
    let mut ticker = ticker(period);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = match cycle.run(&shutdown).await {
            Ok(result) => Arc::new(result),
            Err(DiscoveryError::Cancelled) => break,
            Err(e) => {
                error!(error = %e, "discovery cycle failed");
                continue;
            }
        };

        match results.try_send(result) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("result queue is full, dropping discovery result"),
            Err(TrySendError::Closed(_)) => break,
        }
    }
}

async fn process_results(
    shutdown: CancellationToken,
    mut results: mpsc::Receiver<Arc<DiscoveryResult>>,
    handlers: Vec<Arc<dyn ResultHandler>>,
) {
    loop {
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            result = results.recv() => match result {
                Some(result) => result,
                None => break,
            },
        };

        for handler in &handlers {
            if let Err(e) = handler.handle(&result).await {
                error!(error = format!("{e:#}"), "result handler failed");
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

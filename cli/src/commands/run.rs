use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::*;
use tokio_util::sync::CancellationToken;

use carto_common::config::Config;
use carto_common::network::{DiscoveryResult, NetworkRecord, NetworkStatus};
use carto_common::registry::ClientRegistry;
use carto_common::{info, success};
use carto_core::discovery::{DiscoveryService, ResultHandler, SnapshotPublisher};
use carto_core::storage;
use carto_plugins::StaticSource;

use crate::terminal::{colors, print};

const ONCE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type Detail = (String, ColoredString);

pub async fn run(cfg: Config, once: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    super::cancel_on_interrupt(cancel.clone());

    let store = storage::from_config(&cfg.storage, cancel.clone())?;
    let publisher = Arc::new(SnapshotPublisher::new(store, cfg.storage.key.clone()));

    let mut service = DiscoveryService::new(cfg.discovery.clone(), Arc::new(ClientRegistry::default()));
    service.register_source(Arc::new(StaticSource));

    if once || cfg.run_once {
        let result = tokio::time::timeout(ONCE_TIMEOUT, service.run_once(&cancel))
            .await
            .context("discovery did not finish within 5 minutes")??;

        publisher.handle(&result).await?;
        print_result(&result);
        return Ok(());
    }

    service.on_result(publisher);
    service.start(&cancel);

    cancel.cancelled().await;
    service.stop(SHUTDOWN_GRACE).await?;
    success!("cartographer stopped");
    Ok(())
}

fn print_result(result: &DiscoveryResult) {
    if result.networks.is_empty() {
        print::header("no networks discovered");
        return;
    }

    print::header("discovered networks");
    for (idx, (name, record)) in result.networks.iter().enumerate() {
        print::tree_head(idx, name);
        print::as_tree_one_level(network_details(record));
    }

    let providers: Vec<&str> = result.providers.iter().map(|p| p.name.as_str()).collect();
    let plain = format!(
        "{} networks from {} in {:.2}s",
        result.networks.len(),
        providers.join(", "),
        result.duration
    );
    let styled = format!(
        "{} networks from {} in {}",
        result.networks.len().to_string().green().bold(),
        providers.join(", ").bold(),
        format!("{:.2}s", result.duration).yellow().bold()
    );

    print::fat_separator();
    print::centerln(&plain, &styled);
    info!(networks = result.networks.len(), "discovery finished");
}

fn network_details(record: &NetworkRecord) -> Vec<Detail> {
    let status = match record.status {
        NetworkStatus::Active => record.status.to_string().color(colors::ACTIVE),
        NetworkStatus::Inactive => record.status.to_string().color(colors::INACTIVE),
        NetworkStatus::Unknown => record.status.to_string().color(colors::UNKNOWN),
    };

    let mut details: Vec<Detail> = vec![("Status".to_string(), status)];

    if let Some(chain_id) = record.chain_id {
        details.push(("Chain".to_string(), chain_id.to_string().normal()));
    }
    if let Some(repository) = &record.repository {
        details.push(("Repo".to_string(), repository.as_str().normal()));
    }
    if !record.service_urls.is_empty() {
        let services: Vec<&str> = record.service_urls.keys().map(String::as_str).collect();
        details.push(("Services".to_string(), services.join(", ").normal()));
    }

    details
}

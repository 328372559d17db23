use std::collections::BTreeMap;
use std::sync::Arc;

use colored::*;
use tokio_util::sync::CancellationToken;

use carto_common::config::Config;
use carto_common::info;
use carto_common::network::NetworkStatus;
use carto_common::registry::ClientRegistry;
use carto_core::ranges::{HttpFetcher, RangeParser, RangeService};
use carto_core::storage;

use crate::terminal::print;

pub async fn validator_ranges(cfg: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    super::cancel_on_interrupt(cancel.clone());

    let store = storage::from_config(&cfg.storage, cancel.clone())?;
    let snapshot = super::fetch_snapshot(store.as_ref(), &cfg.storage.key).await?;

    let active: BTreeMap<_, _> = snapshot
        .networks
        .into_iter()
        .filter(|(_, record)| record.status == NetworkStatus::Active)
        .collect();
    info!(networks = active.len(), "processing active networks");

    let service = RangeService::new(
        RangeParser::new(Arc::new(ClientRegistry::default())),
        Arc::new(HttpFetcher::new(cfg.validator_ranges.http_timeout())?),
        store,
        cfg.validator_ranges.clone(),
    );
    let report = service.run(&cancel, &active).await?;

    print::header("validator ranges");
    print::aligned_line("Published", report.published.len().to_string().green().bold());
    print::aligned_line("Skipped", report.skipped.len().to_string().yellow());
    print::aligned_line("Failed", report.failed.len().to_string().red());
    for name in &report.failed {
        print::print_status(format!("{} {}", "failed:".red(), name));
    }
    print::end_of_program();
    Ok(())
}

use std::sync::Arc;

use colored::*;
use tokio_util::sync::CancellationToken;

use carto_common::config::Config;
use carto_common::registry::ClientRegistry;
use carto_core::inventory::{DoraClient, InventoryService};
use carto_core::storage;

use crate::terminal::print;

pub async fn inventory(cfg: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    super::cancel_on_interrupt(cancel.clone());

    let store = storage::from_config(&cfg.storage, cancel.clone())?;
    let api = DoraClient::new(cfg.inventory.health_timeout(), cfg.inventory.fetch_attempts)?;

    let service = InventoryService::new(
        Arc::new(api),
        store,
        Arc::new(ClientRegistry::default()),
        &cfg.inventory,
    )?
    .with_snapshot_key(cfg.storage.key.clone());
    let published = service.run(&cancel).await?;

    print::header("client inventory");
    print::aligned_line("Published", published.len().to_string().green().bold());
    for name in &published {
        print::print_status(name);
    }
    print::end_of_program();
    Ok(())
}

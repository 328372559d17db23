use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use carto_common::network::DiscoveryResult;
use carto_common::storage::{CONTENT_TYPE_JSON, ObjectStore};
use carto_common::{success, warn};

/// Consumer of finished discovery cycles.
#[async_trait]
pub trait ResultHandler: Send + Sync {
    async fn handle(&self, result: &DiscoveryResult) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> ResultHandler for F
where
    F: Fn(&DiscoveryResult) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, result: &DiscoveryResult) -> anyhow::Result<()> {
        self(result)
    }
}

/// Uploads every non-empty result as the network snapshot.
pub struct SnapshotPublisher {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl SnapshotPublisher {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }
}

#[async_trait]
impl ResultHandler for SnapshotPublisher {
    async fn handle(&self, result: &DiscoveryResult) -> anyhow::Result<()> {
        // An empty cycle must not replace the last good snapshot.
        if result.networks.is_empty() {
            warn!(key = %self.key, "discovery returned no networks, keeping previous snapshot");
            return Ok(());
        }

        let body = serde_json::to_vec_pretty(result).context("failed to encode discovery result")?;
        let bytes = body.len();

        self.store
            .upload(&self.key, body, CONTENT_TYPE_JSON)
            .await
            .with_context(|| format!("failed to upload {}", self.key))?;

        success!(key = %self.key, networks = result.networks.len(), bytes, "published network snapshot");
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use carto_common::network::{NetworkRecord, NetworkStatus};

    #[tokio::test]
    async fn empty_result_is_not_published() {
        let store = Arc::new(MemoryStore::default());
        let publisher = SnapshotPublisher::new(store.clone(), "networks.json");

        publisher.handle(&DiscoveryResult::default()).await.unwrap();

        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn result_is_published_as_json() {
        let store = Arc::new(MemoryStore::default());
        let publisher = SnapshotPublisher::new(store.clone(), "networks.json");

        let mut result = DiscoveryResult::default();
        result.networks.insert(
            "hoodi".to_string(),
            NetworkRecord::new("hoodi", NetworkStatus::Active),
        );
        publisher.handle(&result).await.unwrap();

        let snapshot = store.json("networks.json").unwrap();
        assert_eq!(snapshot["networks"]["hoodi"]["status"], "active");
        assert_eq!(store.content_type("networks.json").as_deref(), Some(CONTENT_TYPE_JSON));
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let handler = |result: &DiscoveryResult| -> anyhow::Result<()> {
            anyhow::ensure!(result.networks.is_empty(), "unexpected networks");
            Ok(())
        };
        handler.handle(&DiscoveryResult::default()).await.unwrap();
    }
}

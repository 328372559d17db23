//! Port implemented by every network data source.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::DiscoveryConfig;
use crate::network::NetworkRecord;

/// A source of network records.
///
/// Implementations hold no per-call state and may be invoked concurrently
/// with other sources. A returned error only removes this source's
/// contribution from the cycle.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn discover(
        &self,
        cancel: &CancellationToken,
        config: &DiscoveryConfig,
    ) -> anyhow::Result<BTreeMap<String, NetworkRecord>>;
}

//! Object store backends.
//!
//! Every backend implements [`ObjectStore`]. [`RetryingStore`] wraps any of
//! them with a fixed-delay retry loop, and [`from_config`] assembles the
//! backend selected in the configuration.

use std::sync::Arc;

use carto_common::config::{StorageBackend, StorageConfig};
use carto_common::storage::ObjectStore;
use tokio_util::sync::CancellationToken;

mod http;
mod local;
mod memory;
mod retry;

pub use http::HttpStore;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use retry::{RetryPolicy, RetryingStore};

/// Builds the configured backend wrapped in a [`RetryingStore`].
pub fn from_config(
    cfg: &StorageConfig,
    cancel: CancellationToken,
) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let policy = RetryPolicy {
        max_attempts: cfg.max_attempts,
        delay: cfg.retry_delay(),
    };

    let store: Arc<dyn ObjectStore> = match cfg.backend {
        StorageBackend::Local => Arc::new(RetryingStore::new(
            LocalStore::new(cfg.path.clone()),
            policy,
            cancel,
        )),
        StorageBackend::Http => {
            let endpoint = cfg
                .endpoint
                .clone()
                .ok_or_else(|| anyhow::anyhow!("storage.endpoint is required for the http backend"))?;
            let backend = HttpStore::new(endpoint, cfg.bucket.clone(), cfg.token.clone())?;
            Arc::new(RetryingStore::new(backend, policy, cancel))
        }
        StorageBackend::Memory => Arc::new(MemoryStore::default()),
    };

    Ok(store)
}

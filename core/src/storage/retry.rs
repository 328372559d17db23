use std::time::Duration;

use async_trait::async_trait;
use carto_common::storage::{ObjectStore, StorageError};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Fixed pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Retries every operation of the inner store with a fixed delay.
///
/// The pause between attempts is abandoned as soon as `cancel` fires, in
/// which case [`StorageError::Cancelled`] is returned.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<S: ObjectStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            inner,
            policy,
            cancel,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn pause(&self) -> Result<(), StorageError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(StorageError::Cancelled),
            _ = tokio::time::sleep(self.policy.delay) => Ok(()),
        }
    }

    fn give_up(&self, attempts: usize, last: StorageError) -> StorageError {
        if last.is_retryable() {
            StorageError::Exhausted {
                attempts,
                last: Box::new(last),
            }
        } else {
            last
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for RetryingStore<S> {
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            if self.cancel.is_cancelled() {
                return Err(StorageError::Cancelled);
            }

            match self.inner.upload(key, data.clone(), content_type).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_retryable() || attempt >= max_attempts => {
                    return Err(self.give_up(attempt, e));
                }
                Err(e) => {
                    warn!(key, attempt, max_attempts, error = %e, "upload failed, retrying");
                    self.pause().await?;
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            if self.cancel.is_cancelled() {
                return Err(StorageError::Cancelled);
            }

            match self.inner.download(key).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if !e.is_retryable() || attempt >= max_attempts => {
                    return Err(self.give_up(attempt, e));
                }
                Err(e) => {
                    warn!(key, attempt, max_attempts, error = %e, "download failed, retrying");
                    self.pause().await?;
                }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls with a transport error.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
        store: MemoryStore,
    }

    impl Flaky {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
                store: MemoryStore::default(),
            }
        }

        fn fail(&self, key: &str) -> Result<(), StorageError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(StorageError::Http {
                    key: key.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ObjectStore for Flaky {
        async fn upload(&self, key: &str, data: Vec<u8>, ct: &str) -> Result<(), StorageError> {
            self.fail(key)?;
            self.store.upload(key, data, ct).await
        }

        async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            self.fail(key)?;
            self.store.download(key).await
        }
    }

    fn policy(max_attempts: usize, delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let store = RetryingStore::new(Flaky::new(2), policy(3, 1), CancellationToken::new());

        store.upload("a.json", b"{}".to_vec(), "application/json").await.unwrap();

        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.download("a.json").await.unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn surfaces_exhaustion_with_attempt_count() {
        let store = RetryingStore::new(Flaky::new(usize::MAX), policy(3, 1), CancellationToken::new());

        let err = store.upload("a.json", Vec::new(), "application/json").await.unwrap_err();

        assert!(matches!(err, StorageError::Exhausted { attempts: 3, .. }));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let store = RetryingStore::new(Flaky::new(0), policy(3, 1), CancellationToken::new());

        let err = store.download("missing.json").await.unwrap_err();

        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let store = RetryingStore::new(Flaky::new(usize::MAX), policy(3, 60_000), cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = store.download("a.json").await.unwrap_err();

        assert!(matches!(err, StorageError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

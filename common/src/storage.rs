//! Port for the object store that receives every published artifact.

use async_trait::async_trait;
use thiserror::Error;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Well-known artifact keys.
pub mod keys {
    pub const NETWORKS: &str = "networks.json";

    pub fn validator_ranges(network: &str) -> String {
        format!("validator-ranges/{network}.json")
    }

    pub fn inventory(network: &str) -> String {
        format!("inventory/{network}.json")
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("i/o error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request for '{key}' failed: {reason}")]
    Http { key: String, reason: String },

    #[error("request for '{key}' returned status {status}")]
    Status { key: String, status: u16 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: Box<StorageError>,
    },
}

impl StorageError {
    /// Whether another attempt could change the outcome.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            StorageError::NotFound(_)
                | StorageError::InvalidKey(_)
                | StorageError::Cancelled
                | StorageError::Exhausted { .. }
        )
    }
}

/// Keyed blob storage for published artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<T> {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        (**self).upload(key, data, content_type).await
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        (**self).download(key).await
    }
}

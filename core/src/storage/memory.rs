use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use carto_common::storage::{ObjectStore, StorageError};

/// In-process store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

impl MemoryStore {
    pub fn keys(&self) -> Vec<String> {
        let objects = self.objects.read().unwrap_or_else(|p| p.into_inner());
        objects.keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        let objects = self.objects.read().unwrap_or_else(|p| p.into_inner());
        objects.get(key).map(|o| o.content_type.clone())
    }

    /// Decodes a stored JSON object.
    pub fn json(&self, key: &str) -> Option<serde_json::Value> {
        let objects = self.objects.read().unwrap_or_else(|p| p.into_inner());
        objects
            .get(key)
            .and_then(|o| serde_json::from_slice(&o.data).ok())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.write().unwrap_or_else(|p| p.into_inner());
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let objects = self.objects.read().unwrap_or_else(|p| p.into_inner());
        objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use carto_common::storage::{ObjectStore, StorageError};
use tracing::debug;

/// Stores objects as files below a root directory.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolves `key` below the root, refusing absolute keys and `..`.
    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // Write next to the target first so readers never observe a partial file.
        let staging = path.with_extension("partial");
        tokio::fs::write(&staging, &data).await.map_err(io_err)?;
        tokio::fs::rename(&staging, &path).await.map_err(io_err)?;

        debug!(key, path = %path.display(), bytes = data.len(), "stored object");
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
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

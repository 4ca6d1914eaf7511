//! Storage provider abstraction.
//!
//! Generalizes `citadel-keystore::storage::{FileBackend, InMemoryBackend}`
//! from a key-scoped store (one file per `KeyId`) to an arbitrary path tree,
//! and promotes the trait itself to `async` so every suspension point —
//! disk I/O included — is explicit to callers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::StorageError;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
    async fn create_directory(&self, path: &str) -> Result<(), StorageError>;
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    /// Writes `contents` so that readers never observe a partial file:
    /// write to a sibling temp path, then rename over `path`.
    async fn write_atomic(&self, path: &str, contents: &[u8]) -> Result<(), StorageError>;
    async fn delete_file(&self, path: &str) -> Result<(), StorageError>;
    async fn delete_directory(&self, path: &str) -> Result<(), StorageError>;
    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError>;
    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError>;
    async fn move_path(&self, from: &str, to: &str) -> Result<(), StorageError>;
}

/// Filesystem-backed storage rooted at `root`. Grounded on
/// `citadel-keystore::storage::FileBackend::put`'s temp-file + rename
/// pattern, generalized to arbitrary relative paths.
pub struct NativeStorage {
    root: PathBuf,
}

impl NativeStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn temp_path(target: &Path) -> PathBuf {
        let mut name = target.file_name().and_then(|n| n.to_str()).unwrap_or("tmp").to_string();
        name.push_str(".tmp");
        target.with_file_name(name)
    }
}

#[async_trait]
impl StorageBackend for NativeStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.resolve(path)).await?)
    }

    async fn create_directory(&self, path: &str) -> Result<(), StorageError> {
        fs::create_dir_all(self.resolve(path)).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path);
        fs::read(&full)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
                _ => StorageError::Io(e),
            })
    }

    async fn write_atomic(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp = Self::temp_path(&full);
        fs::write(&temp, contents).await?;
        fs::rename(&temp, &full).await?;
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        fs::remove_file(self.resolve(path)).await?;
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> Result<(), StorageError> {
        fs::remove_dir_all(self.resolve(path)).await?;
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let mut entries = fs::read_dir(self.resolve(dir)).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let dest = self.resolve(to);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(self.resolve(from), dest).await?;
        Ok(())
    }

    async fn move_path(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let dest = self.resolve(to);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(self.resolve(from), dest).await?;
        Ok(())
    }
}

/// In-memory storage for tests, generalizing
/// `citadel-keystore::storage::InMemoryBackend`'s `RwLock<HashMap<...>>`
/// from key ids to a virtual path tree. Never persists across process exit.
#[derive(Default)]
pub struct MemoryStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn normalize(path: &str) -> String {
        path.trim_start_matches('/').to_string()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let key = Self::normalize(path);
        let files = self.files.read().await;
        Ok(files.contains_key(&key) || files.keys().any(|k| k.starts_with(&format!("{key}/"))))
    }

    async fn create_directory(&self, _path: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let key = Self::normalize(path);
        self.files
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn write_atomic(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let key = Self::normalize(path);
        self.files.write().await.insert(key, contents.to_vec());
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        let key = Self::normalize(path);
        self.files
            .write()
            .await
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete_directory(&self, path: &str) -> Result<(), StorageError> {
        let prefix = format!("{}/", Self::normalize(path));
        self.files.write().await.retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let prefix = format!("{}/", Self::normalize(dir));
        let files = self.files.read().await;
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(|rest| rest.split('/').next().unwrap_or(rest).to_string())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let contents = self.read(from).await?;
        self.write_atomic(to, &contents).await
    }

    async fn move_path(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let contents = self.read(from).await?;
        self.write_atomic(to, &contents).await?;
        self.delete_file(from).await
    }
}

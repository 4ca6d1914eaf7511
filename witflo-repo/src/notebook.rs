//! Notebook repository: named containers with single-level nesting.
//!
//! Present because the wider note-taking domain assumes notebooks even
//! though the distilled spec focuses on notes; see `SPEC_FULL.md` §4.10.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use witflo_primitives::VaultKey;
use witflo_storage::StorageBackend;
use witflo_vault::layout;

use crate::error::RepoError;
use crate::index::MetadataCache;

pub type NotebookId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookMetadata {
    pub id: NotebookId,
    pub name: String,
    pub parent_id: Option<NotebookId>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

pub struct NotebookRepository {
    storage: Arc<dyn StorageBackend>,
    vault_key: VaultKey,
    cache: MetadataCache<NotebookMetadata>,
}

impl NotebookRepository {
    pub fn new(storage: Arc<dyn StorageBackend>, vault_key: VaultKey) -> Self {
        Self { storage, vault_key, cache: MetadataCache::new() }
    }

    /// Loads `refs/notebooks.jsonl.enc` and rebuilds the in-memory cache
    /// from it, or starts empty if the vault has never stored a notebook.
    pub async fn open(storage: Arc<dyn StorageBackend>, vault_key: VaultKey) -> Result<Self, RepoError> {
        let mut repo = Self::new(storage, vault_key);
        repo.reload().await?;
        Ok(repo)
    }

    /// Re-reads `refs/notebooks.jsonl.enc` from storage, discarding any
    /// unpersisted in-memory changes. Callers invoke this after an
    /// externally observed change to the file (`witflo_sync::watcher`),
    /// since another device may have written it.
    pub async fn reload(&mut self) -> Result<(), RepoError> {
        use witflo_primitives::aead;

        let path = layout::refs_file("notebooks");
        self.cache = if self.storage.exists(&path).await.map_err(witflo_vault::VaultError::from)? {
            let sealed = self.storage.read(&path).await.map_err(witflo_vault::VaultError::from)?;
            let notebook_key = self.vault_key.derive_notebook("index")?;
            let plaintext = aead::open(notebook_key.expose_secret()?, &sealed, b"witflo.notebooks.index.v1")
                .map_err(|e| RepoError::IndexCorrupt(e.to_string()))?;
            crate::index::rebuild(plaintext.expose_secret()?, |m: &NotebookMetadata| m.id)
                .map_err(|e| RepoError::IndexCorrupt(e.to_string()))?
        } else {
            MetadataCache::new()
        };
        Ok(())
    }

    pub fn create(&mut self, name: String, parent_id: Option<NotebookId>) -> NotebookId {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.cache.insert(
            id,
            NotebookMetadata { id, name, parent_id, created_at: now, modified_at: now, extra: HashMap::new() },
        );
        id
    }

    pub fn metadata(&self, id: &NotebookId) -> Option<&NotebookMetadata> {
        self.cache.get(id)
    }

    pub fn rename(&mut self, id: &NotebookId, name: String) -> Result<(), RepoError> {
        let meta = self.cache.get_mut(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        meta.name = name;
        meta.modified_at = Utc::now();
        Ok(())
    }

    /// Removes the notebook from the index. Callers are responsible for
    /// detaching its notes first (`NoteRepository::detach_notebook`) — this
    /// repository does not reach across to notes itself.
    pub fn delete(&mut self, id: &NotebookId) -> Result<(), RepoError> {
        self.cache.remove(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        Ok(())
    }

    pub fn list_children(&self, parent_id: Option<NotebookId>) -> Vec<&NotebookMetadata> {
        self.cache.values().filter(|n| n.parent_id == parent_id).collect()
    }

    pub async fn persist(&self) -> Result<(), RepoError> {
        use witflo_primitives::aead;
        let plaintext = crate::index::to_jsonl(&self.cache.snapshot()).map_err(|e| RepoError::IndexCorrupt(e.to_string()))?;
        let notebook_key = self.vault_key.derive_notebook("index")?;
        let sealed = aead::seal(notebook_key.expose_secret()?, &plaintext, b"witflo.notebooks.index.v1")?;
        self.storage
            .write_atomic(&layout::refs_file("notebooks"), &sealed)
            .await
            .map_err(witflo_vault::VaultError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use witflo_storage::MemoryStorage;

    #[test]
    fn single_level_nesting_is_tracked() {
        let mut repo = NotebookRepository::new(MemoryStorage::new(), VaultKey::from_bytes(vec![1u8; 32]));
        let parent = repo.create("Work".into(), None);
        let child = repo.create("Projects".into(), Some(parent));
        assert_eq!(repo.metadata(&child).unwrap().parent_id, Some(parent));
        assert_eq!(repo.list_children(Some(parent)).len(), 1);
    }

    #[tokio::test]
    async fn tampered_index_fails_with_index_corrupt_not_invalid_password() {
        let storage = MemoryStorage::new();
        let key = VaultKey::from_bytes(vec![1u8; 32]);
        {
            let mut repo = NotebookRepository::new(storage.clone(), key.clone());
            repo.create("Work".into(), None);
            repo.persist().await.unwrap();
        }

        let path = layout::refs_file("notebooks");
        let mut sealed = storage.read(&path).await.unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        storage.write_atomic(&path, &sealed).await.unwrap();

        let err = NotebookRepository::open(storage, key).await.unwrap_err();
        assert!(matches!(err, RepoError::IndexCorrupt(_)));
    }

    #[tokio::test]
    async fn open_rebuilds_the_cache_from_the_persisted_index() {
        let storage = MemoryStorage::new();
        let key = VaultKey::from_bytes(vec![1u8; 32]);
        let id = {
            let mut repo = NotebookRepository::new(storage.clone(), key.clone());
            let id = repo.create("Work".into(), None);
            repo.persist().await.unwrap();
            id
        };

        let reopened = NotebookRepository::open(storage, key).await.unwrap();
        assert_eq!(reopened.metadata(&id).unwrap().name, "Work");
    }
}

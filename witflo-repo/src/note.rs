//! Note repository: encrypted note bodies content-addressed under
//! `objects/`, with a plaintext-shape (but individually encrypted)
//! metadata cache for listing without unlocking every note.
//!
//! Grounded on `citadel-keystore::keystore::Keystore`'s
//! `encrypt`/`decrypt` convenience wrappers — derive a per-object key,
//! seal, store — generalized from "one key per keystore" to "one
//! `ContentKey` per note, derived on demand from the `VaultKey`".

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use witflo_primitives::{aead, hash, VaultKey};
use witflo_storage::StorageBackend;
use witflo_vault::layout;

use crate::error::RepoError;
use crate::index::MetadataCache;
use crate::tag_index::TagIndex;

pub type NoteId = Uuid;

/// Pin/archive/trash state (`spec.md` §3: "flags {pinned, archived,
/// trashed}"). All three are independent booleans rather than an enum —
/// a trashed note can still be pinned, so restoring it doesn't lose that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteFlags {
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub trashed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub id: NoteId,
    pub title: String,
    pub notebook_id: Option<Uuid>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub flags: NoteFlags,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// BLAKE3 hash of the current encrypted body, i.e. its object-store
    /// address under `objects/`.
    pub body_hash: [u8; 32],
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

pub struct NoteRepository {
    storage: Arc<dyn StorageBackend>,
    vault_key: VaultKey,
    cache: MetadataCache<NoteMetadata>,
    tag_index: TagIndex,
}

impl NoteRepository {
    pub fn new(storage: Arc<dyn StorageBackend>, vault_key: VaultKey) -> Self {
        let tag_index = TagIndex::new(storage.clone(), vault_key.clone());
        Self { storage, vault_key, cache: MetadataCache::new(), tag_index }
    }

    /// Loads `refs/notes.jsonl.enc` and `refs/tags.jsonl.enc`, rebuilding
    /// both in-memory caches, or starts empty if the vault has never stored
    /// a note.
    pub async fn open(storage: Arc<dyn StorageBackend>, vault_key: VaultKey) -> Result<Self, RepoError> {
        let mut repo = Self::new(storage, vault_key);
        repo.reload().await?;
        Ok(repo)
    }

    /// Re-reads both index files from storage, discarding any unpersisted
    /// in-memory changes. Callers invoke this after an externally observed
    /// change to `refs/notes.jsonl.enc` or `refs/tags.jsonl.enc`
    /// (`witflo_sync::watcher`), since another device may have written them.
    pub async fn reload(&mut self) -> Result<(), RepoError> {
        let path = layout::refs_file("notes");
        self.cache = if self.storage.exists(&path).await.map_err(witflo_vault::VaultError::from)? {
            let sealed = self.storage.read(&path).await.map_err(witflo_vault::VaultError::from)?;
            let search_key = self.vault_key.derive_search()?;
            let plaintext = aead::open(search_key.expose_secret()?, &sealed, b"witflo.notes.index.v1")
                .map_err(|e| RepoError::IndexCorrupt(e.to_string()))?;
            crate::index::rebuild(plaintext.expose_secret()?, |m: &NoteMetadata| m.id)
                .map_err(|e| RepoError::IndexCorrupt(e.to_string()))?
        } else {
            MetadataCache::new()
        };
        self.tag_index.reload().await?;
        Ok(())
    }

    pub async fn create(&mut self, title: String, body: &str, notebook_id: Option<Uuid>) -> Result<NoteId, RepoError> {
        let id = Uuid::new_v4();
        let body_hash = self.write_body(&id, body).await?;
        let now = Utc::now();
        let meta = NoteMetadata {
            id,
            title,
            notebook_id,
            tags: Vec::new(),
            flags: NoteFlags::default(),
            created_at: now,
            modified_at: now,
            body_hash,
            extra: HashMap::new(),
        };
        self.cache.insert(id, meta);
        self.persist_index().await?;
        Ok(id)
    }

    pub async fn update_body(&mut self, id: &NoteId, body: &str) -> Result<(), RepoError> {
        let body_hash = self.write_body(id, body).await?;
        let meta = self.cache.get_mut(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        meta.body_hash = body_hash;
        meta.modified_at = Utc::now();
        self.persist_index().await?;
        Ok(())
    }

    pub async fn read_body(&self, id: &NoteId) -> Result<String, RepoError> {
        let meta = self.cache.get(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        let content_key = self.vault_key.derive_content(&id.to_string())?;
        let sealed = self.storage.read(&layout::object_path(&meta.body_hash)).await.map_err(witflo_vault::VaultError::from)?;
        let plaintext = aead::open(content_key.expose_secret()?, &sealed, id.as_bytes())?;
        Ok(String::from_utf8_lossy(plaintext.expose_secret()?).into_owned())
    }

    pub fn metadata(&self, id: &NoteId) -> Option<&NoteMetadata> {
        self.cache.get(id)
    }

    pub async fn delete(&mut self, id: &NoteId) -> Result<(), RepoError> {
        self.cache.remove(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        self.tag_index.remove_note(id);
        self.tag_index.persist().await?;
        self.persist_index().await?;
        Ok(())
    }

    pub async fn set_tags(&mut self, id: &NoteId, tags: Vec<String>) -> Result<(), RepoError> {
        let meta = self.cache.get_mut(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        meta.tags = tags.clone();
        meta.modified_at = Utc::now();
        self.tag_index.set_tags(*id, &tags);
        self.tag_index.persist().await?;
        Ok(())
    }

    pub fn set_pinned(&mut self, id: &NoteId, pinned: bool) -> Result<(), RepoError> {
        let meta = self.cache.get_mut(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        meta.flags.pinned = pinned;
        meta.modified_at = Utc::now();
        Ok(())
    }

    pub fn set_archived(&mut self, id: &NoteId, archived: bool) -> Result<(), RepoError> {
        let meta = self.cache.get_mut(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        meta.flags.archived = archived;
        meta.modified_at = Utc::now();
        Ok(())
    }

    pub fn set_trashed(&mut self, id: &NoteId, trashed: bool) -> Result<(), RepoError> {
        let meta = self.cache.get_mut(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        meta.flags.trashed = trashed;
        meta.modified_at = Utc::now();
        Ok(())
    }

    /// All non-trashed notes, paginated. `spec.md` §4.10's `list_all`;
    /// callers see trashed notes only through [`Self::list_trashed`].
    pub fn list_all(&self, limit: usize, offset: usize) -> Vec<&NoteMetadata> {
        self.cache.values().filter(|n| !n.flags.trashed).skip(offset).take(limit).collect()
    }

    pub fn list_trashed(&self, limit: usize, offset: usize) -> Vec<&NoteMetadata> {
        self.cache.values().filter(|n| n.flags.trashed).skip(offset).take(limit).collect()
    }

    /// Notes in `notebook_id`, or unfiled notes when `None`.
    pub fn list_by_notebook(&self, notebook_id: Option<Uuid>, limit: usize, offset: usize) -> Vec<&NoteMetadata> {
        self.cache.values().filter(|n| n.notebook_id == notebook_id).skip(offset).take(limit).collect()
    }

    /// Lists notes tagged `tag`, paginated, via the tag index rather than a
    /// full cache scan.
    pub fn list_by_tag(&self, tag: &str, limit: usize, offset: usize) -> Vec<&NoteMetadata> {
        self.tag_index.list(tag, limit, offset).into_iter().filter_map(|id| self.cache.get(&id)).collect()
    }

    /// Substring/prefix match over cached titles. This is not the blind
    /// tokenized search index (`refs/search.db.enc`) — that index's key
    /// derivation and file format are implemented by `VaultKey::derive_search`
    /// and `witflo_vault::layout::refs_file`, but no query planner sits on
    /// top of it here.
    pub fn search_by_title(&self, query: &str, limit: usize, offset: usize) -> Vec<&NoteMetadata> {
        let needle = query.to_lowercase();
        self.cache
            .values()
            .filter(|n| n.title.to_lowercase().contains(&needle))
            .skip(offset)
            .take(limit)
            .collect()
    }

    /// Detaches (does not delete) every note in a removed notebook.
    pub fn detach_notebook(&mut self, notebook_id: &Uuid) {
        for meta in self.cache.values_mut() {
            if meta.notebook_id.as_ref() == Some(notebook_id) {
                meta.notebook_id = None;
            }
        }
    }

    async fn write_body(&self, id: &NoteId, body: &str) -> Result<[u8; 32], RepoError> {
        let content_key = self.vault_key.derive_content(&id.to_string())?;
        let sealed = aead::seal(content_key.expose_secret()?, body.as_bytes(), id.as_bytes())?;
        let body_hash = hash::blake3(&sealed);
        self.storage
            .write_atomic(&layout::object_path(&body_hash), &sealed)
            .await
            .map_err(witflo_vault::VaultError::from)?;
        Ok(body_hash)
    }

    async fn persist_index(&self) -> Result<(), RepoError> {
        let plaintext = crate::index::to_jsonl(&self.cache.snapshot()).map_err(|e| RepoError::IndexCorrupt(e.to_string()))?;
        let search_key = self.vault_key.derive_search()?;
        let sealed = aead::seal(search_key.expose_secret()?, &plaintext, b"witflo.notes.index.v1")?;
        self.storage
            .write_atomic(&layout::refs_file("notes"), &sealed)
            .await
            .map_err(witflo_vault::VaultError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use witflo_storage::MemoryStorage;

    fn test_key() -> VaultKey {
        VaultKey::from_bytes(vec![5u8; 32])
    }

    #[tokio::test]
    async fn create_and_read_body_roundtrips() {
        let mut repo = NoteRepository::new(MemoryStorage::new(), test_key());
        let id = repo.create("Groceries".into(), "milk, eggs", None).await.unwrap();
        assert_eq!(repo.read_body(&id).await.unwrap(), "milk, eggs");
    }

    #[tokio::test]
    async fn update_body_changes_the_hash() {
        let mut repo = NoteRepository::new(MemoryStorage::new(), test_key());
        let id = repo.create("Note".into(), "v1", None).await.unwrap();
        let hash_before = repo.metadata(&id).unwrap().body_hash;
        repo.update_body(&id, "v2").await.unwrap();
        assert_ne!(repo.metadata(&id).unwrap().body_hash, hash_before);
        assert_eq!(repo.read_body(&id).await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn list_by_tag_paginates() {
        let mut repo = NoteRepository::new(MemoryStorage::new(), test_key());
        for i in 0..5 {
            let id = repo.create(format!("Note {i}"), "body", None).await.unwrap();
            repo.set_tags(&id, vec!["work".into()]).await.unwrap();
        }
        let page = repo.list_by_tag("work", 2, 0);
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn open_rebuilds_the_cache_from_the_persisted_index() {
        let storage = MemoryStorage::new();
        let id = {
            let mut repo = NoteRepository::new(storage.clone(), test_key());
            let id = repo.create("Groceries".into(), "milk, eggs", None).await.unwrap();
            id
        };

        let reopened = NoteRepository::open(storage, test_key()).await.unwrap();
        assert_eq!(reopened.metadata(&id).unwrap().title, "Groceries");
        assert_eq!(reopened.read_body(&id).await.unwrap(), "milk, eggs");
    }

    #[tokio::test]
    async fn open_on_a_fresh_vault_starts_empty() {
        let storage = MemoryStorage::new();
        let repo = NoteRepository::open(storage, test_key()).await.unwrap();
        assert!(repo.metadata(&Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn tampered_index_fails_with_index_corrupt_not_invalid_password() {
        let storage = MemoryStorage::new();
        {
            let mut repo = NoteRepository::new(storage.clone(), test_key());
            repo.create("Groceries".into(), "milk, eggs", None).await.unwrap();
        }

        let path = layout::refs_file("notes");
        let mut sealed = storage.read(&path).await.unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        storage.write_atomic(&path, &sealed).await.unwrap();

        let err = NoteRepository::open(storage, test_key()).await.unwrap_err();
        assert!(matches!(err, RepoError::IndexCorrupt(_)));
    }

    #[tokio::test]
    async fn trashed_notes_are_excluded_from_list_all_and_included_in_list_trashed() {
        let mut repo = NoteRepository::new(MemoryStorage::new(), test_key());
        let kept = repo.create("Kept".into(), "body", None).await.unwrap();
        let trashed = repo.create("Trashed".into(), "body", None).await.unwrap();
        repo.set_trashed(&trashed, true).unwrap();

        let all = repo.list_all(10, 0);
        assert!(all.iter().any(|n| n.id == kept));
        assert!(!all.iter().any(|n| n.id == trashed));

        let in_trash = repo.list_trashed(10, 0);
        assert_eq!(in_trash.len(), 1);
        assert_eq!(in_trash[0].id, trashed);
    }

    #[tokio::test]
    async fn list_by_notebook_filters_by_id_including_unfiled() {
        let mut repo = NoteRepository::new(MemoryStorage::new(), test_key());
        let notebook_id = Uuid::new_v4();
        let filed = repo.create("Filed".into(), "body", Some(notebook_id)).await.unwrap();
        let unfiled = repo.create("Unfiled".into(), "body", None).await.unwrap();

        let in_notebook = repo.list_by_notebook(Some(notebook_id), 10, 0);
        assert_eq!(in_notebook.len(), 1);
        assert_eq!(in_notebook[0].id, filed);

        let unfiled_list = repo.list_by_notebook(None, 10, 0);
        assert_eq!(unfiled_list.len(), 1);
        assert_eq!(unfiled_list[0].id, unfiled);
    }

    #[tokio::test]
    async fn pin_and_archive_flags_round_trip() {
        let mut repo = NoteRepository::new(MemoryStorage::new(), test_key());
        let id = repo.create("Note".into(), "body", None).await.unwrap();
        repo.set_pinned(&id, true).unwrap();
        repo.set_archived(&id, true).unwrap();
        let meta = repo.metadata(&id).unwrap();
        assert!(meta.flags.pinned);
        assert!(meta.flags.archived);
        assert!(!meta.flags.trashed);
    }

    #[tokio::test]
    async fn detaching_a_notebook_keeps_notes() {
        let mut repo = NoteRepository::new(MemoryStorage::new(), test_key());
        let notebook_id = Uuid::new_v4();
        let id = repo.create("Note".into(), "body", Some(notebook_id)).await.unwrap();
        repo.detach_notebook(&notebook_id);
        assert_eq!(repo.metadata(&id).unwrap().notebook_id, None);
    }
}

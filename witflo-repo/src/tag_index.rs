//! Tag -> note id index over `refs/tags.jsonl.enc`, so `NoteRepository::list_by_tag`
//! can avoid a full metadata-cache scan for large vaults (`SPEC_FULL.md` §4.10).
//!
//! Grounded on `crate::index::MetadataCache`'s load/rebuild/persist shape,
//! generalized from "one entry per id" to "one entry per tag, fanning out to
//! the ids tagged with it".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use witflo_primitives::{aead, VaultKey};
use witflo_storage::StorageBackend;
use witflo_vault::layout;

use crate::error::RepoError;
use crate::note::NoteId;

#[derive(Serialize, Deserialize)]
struct TagIndexRecord {
    tag: String,
    note_ids: Vec<NoteId>,
}

pub struct TagIndex {
    storage: Arc<dyn StorageBackend>,
    vault_key: VaultKey,
    entries: HashMap<String, HashSet<NoteId>>,
}

impl TagIndex {
    pub fn new(storage: Arc<dyn StorageBackend>, vault_key: VaultKey) -> Self {
        Self { storage, vault_key, entries: HashMap::new() }
    }

    /// Loads `refs/tags.jsonl.enc`, or starts empty if the vault has never
    /// tagged a note.
    pub async fn open(storage: Arc<dyn StorageBackend>, vault_key: VaultKey) -> Result<Self, RepoError> {
        let mut index = Self::new(storage, vault_key);
        index.reload().await?;
        Ok(index)
    }

    /// Re-reads the index file from storage, discarding any unpersisted
    /// in-memory changes. Used to recover after an external change to the
    /// file is observed (`witflo_sync::watcher`).
    pub async fn reload(&mut self) -> Result<(), RepoError> {
        let path = layout::refs_file("tags");
        if !self.storage.exists(&path).await.map_err(witflo_vault::VaultError::from)? {
            self.entries = HashMap::new();
            return Ok(());
        }
        let sealed = self.storage.read(&path).await.map_err(witflo_vault::VaultError::from)?;
        let tag_key = self.vault_key.derive_tag_index()?;
        let plaintext = aead::open(tag_key.expose_secret()?, &sealed, b"witflo.tags.index.v1")
            .map_err(|e| RepoError::IndexCorrupt(e.to_string()))?;
        let mut records = Vec::new();
        for line in plaintext.expose_secret()?.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            let record: TagIndexRecord =
                serde_json::from_slice(line).map_err(|e| RepoError::IndexCorrupt(e.to_string()))?;
            records.push(record);
        }
        self.entries = records.into_iter().map(|r| (r.tag, r.note_ids.into_iter().collect())).collect();
        Ok(())
    }

    pub async fn persist(&self) -> Result<(), RepoError> {
        let records: Vec<TagIndexRecord> = self
            .entries
            .iter()
            .map(|(tag, ids)| TagIndexRecord { tag: tag.clone(), note_ids: ids.iter().copied().collect() })
            .collect();
        let plaintext = crate::index::to_jsonl(&records).map_err(|e| RepoError::IndexCorrupt(e.to_string()))?;
        let tag_key = self.vault_key.derive_tag_index()?;
        let sealed = aead::seal(tag_key.expose_secret()?, &plaintext, b"witflo.tags.index.v1")?;
        self.storage
            .write_atomic(&layout::refs_file("tags"), &sealed)
            .await
            .map_err(witflo_vault::VaultError::from)?;
        Ok(())
    }

    /// Replaces the full tag set for `note_id`.
    pub fn set_tags(&mut self, note_id: NoteId, tags: &[String]) {
        self.remove_note(&note_id);
        for tag in tags {
            self.entries.entry(tag.clone()).or_default().insert(note_id);
        }
    }

    pub fn remove_note(&mut self, note_id: &NoteId) {
        for ids in self.entries.values_mut() {
            ids.remove(note_id);
        }
        self.entries.retain(|_, ids| !ids.is_empty());
    }

    /// Lists note ids tagged `tag`, paginated. Ids are sorted first so
    /// pagination is stable across calls (`HashSet` iteration order isn't).
    pub fn list(&self, tag: &str, limit: usize, offset: usize) -> Vec<NoteId> {
        let Some(ids) = self.entries.get(tag) else { return Vec::new() };
        let mut sorted: Vec<NoteId> = ids.iter().copied().collect();
        sorted.sort();
        sorted.into_iter().skip(offset).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use witflo_storage::MemoryStorage;

    fn test_key() -> VaultKey {
        VaultKey::from_bytes(vec![3u8; 32])
    }

    #[test]
    fn set_tags_then_list_finds_the_note() {
        let mut index = TagIndex::new(MemoryStorage::new(), test_key());
        let id = Uuid::new_v4();
        index.set_tags(id, &["work".into(), "urgent".into()]);
        assert_eq!(index.list("work", 10, 0), vec![id]);
        assert_eq!(index.list("urgent", 10, 0), vec![id]);
        assert!(index.list("personal", 10, 0).is_empty());
    }

    #[test]
    fn retagging_removes_stale_associations() {
        let mut index = TagIndex::new(MemoryStorage::new(), test_key());
        let id = Uuid::new_v4();
        index.set_tags(id, &["work".into()]);
        index.set_tags(id, &["personal".into()]);
        assert!(index.list("work", 10, 0).is_empty());
        assert_eq!(index.list("personal", 10, 0), vec![id]);
    }

    #[tokio::test]
    async fn persist_then_reload_roundtrips() {
        let storage = MemoryStorage::new();
        let id = Uuid::new_v4();
        {
            let mut index = TagIndex::new(storage.clone(), test_key());
            index.set_tags(id, &["work".into()]);
            index.persist().await.unwrap();
        }

        let reopened = TagIndex::open(storage, test_key()).await.unwrap();
        assert_eq!(reopened.list("work", 10, 0), vec![id]);
    }

    #[tokio::test]
    async fn tampered_index_fails_with_index_corrupt() {
        let storage = MemoryStorage::new();
        {
            let mut index = TagIndex::new(storage.clone(), test_key());
            index.set_tags(Uuid::new_v4(), &["work".into()]);
            index.persist().await.unwrap();
        }

        let path = layout::refs_file("tags");
        let mut sealed = storage.read(&path).await.unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        storage.write_atomic(&path, &sealed).await.unwrap();

        let err = TagIndex::open(storage, test_key()).await.unwrap_err();
        assert!(matches!(err, RepoError::IndexCorrupt(_)));
    }
}

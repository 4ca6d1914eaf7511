//! Encrypted read/write shape for the blind search index
//! (`refs/search.db.enc`), per `SPEC_FULL.md` §4.10: this implements
//! `SearchKey` derivation and the file's seal/open round trip, not a
//! tokenizer or query planner — that's explicitly out of scope
//! (`spec.md` §1's Non-goals). [`crate::NoteRepository::search_by_title`]
//! is the substring search actually exposed to callers today; this module
//! exists so a future tokenizer has somewhere to read and write its index
//! without inventing a new file format.

use std::sync::Arc;

use witflo_primitives::{aead, VaultKey};
use witflo_storage::StorageBackend;
use witflo_vault::layout;

use crate::error::RepoError;

pub struct SearchIndexFile {
    storage: Arc<dyn StorageBackend>,
    vault_key: VaultKey,
}

impl SearchIndexFile {
    pub fn new(storage: Arc<dyn StorageBackend>, vault_key: VaultKey) -> Self {
        Self { storage, vault_key }
    }

    /// Reads and decrypts the raw index bytes, or `None` if the vault has
    /// never written one. The contents are opaque here.
    pub async fn read(&self) -> Result<Option<Vec<u8>>, RepoError> {
        if !self.storage.exists(layout::SEARCH_INDEX_FILE).await.map_err(witflo_vault::VaultError::from)? {
            return Ok(None);
        }
        let sealed = self.storage.read(layout::SEARCH_INDEX_FILE).await.map_err(witflo_vault::VaultError::from)?;
        let search_key = self.vault_key.derive_search()?;
        let plaintext = aead::open(search_key.expose_secret()?, &sealed, b"witflo.search.index.v1")
            .map_err(|e| RepoError::IndexCorrupt(e.to_string()))?;
        Ok(Some(plaintext.expose_secret()?.to_vec()))
    }

    pub async fn write(&self, raw_index: &[u8]) -> Result<(), RepoError> {
        let search_key = self.vault_key.derive_search()?;
        let sealed = aead::seal(search_key.expose_secret()?, raw_index, b"witflo.search.index.v1")?;
        self.storage
            .write_atomic(layout::SEARCH_INDEX_FILE, &sealed)
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
        VaultKey::from_bytes(vec![8u8; 32])
    }

    #[tokio::test]
    async fn read_on_a_fresh_vault_is_none() {
        let file = SearchIndexFile::new(MemoryStorage::new(), test_key());
        assert!(file.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let storage = MemoryStorage::new();
        let file = SearchIndexFile::new(storage, test_key());
        file.write(b"opaque index bytes").await.unwrap();
        assert_eq!(file.read().await.unwrap().unwrap(), b"opaque index bytes");
    }

    #[tokio::test]
    async fn tampered_index_fails_with_index_corrupt() {
        let storage = MemoryStorage::new();
        let file = SearchIndexFile::new(storage.clone(), test_key());
        file.write(b"opaque index bytes").await.unwrap();

        let mut sealed = storage.read(layout::SEARCH_INDEX_FILE).await.unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        storage.write_atomic(layout::SEARCH_INDEX_FILE, &sealed).await.unwrap();

        let err = file.read().await.unwrap_err();
        assert!(matches!(err, RepoError::IndexCorrupt(_)));
    }
}

//! Sync cursor: the highest Lamport timestamp already applied from remote
//! peers, persisted under `sync/cursor.enc` (`spec.md` §4.11) so a restart
//! doesn't replay operations the vault has already folded in.
//!
//! Grounded on `witflo-sync::log::SyncLog`'s seal/write-atomic shape, scaled
//! down from one file per operation to a single cursor record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use witflo_primitives::{aead, SyncKey};
use witflo_storage::StorageBackend;
use witflo_vault::layout;

use crate::clock::LamportTimestamp;
use crate::error::SyncError;

#[derive(Serialize, Deserialize)]
struct CursorPayload {
    applied: LamportTimestamp,
}

pub struct SyncCursor {
    storage: Arc<dyn StorageBackend>,
    sync_key: SyncKey,
}

impl SyncCursor {
    pub fn new(storage: Arc<dyn StorageBackend>, sync_key: SyncKey) -> Self {
        Self { storage, sync_key }
    }

    /// The last-applied timestamp, or `None` if the cursor has never been
    /// advanced (a fresh vault, or one that has never synced).
    pub async fn read(&self) -> Result<Option<LamportTimestamp>, SyncError> {
        if !self.storage.exists(layout::SYNC_CURSOR_FILE).await.map_err(witflo_vault::VaultError::from)? {
            return Ok(None);
        }
        let sealed = self.storage.read(layout::SYNC_CURSOR_FILE).await.map_err(witflo_vault::VaultError::from)?;
        let plaintext = aead::open(self.sync_key.expose_secret()?, &sealed, b"witflo.sync.cursor.v1")?;
        let payload: CursorPayload = serde_json::from_slice(plaintext.expose_secret()?)
            .map_err(|e| SyncError::Vault(witflo_vault::VaultError::HeaderCorrupt(e.to_string())))?;
        Ok(Some(payload.applied))
    }

    /// Advances the cursor to `applied`. Callers are responsible for only
    /// advancing forward (`crate::clock::order`) — this just persists
    /// whatever timestamp it's given.
    pub async fn advance(&self, applied: LamportTimestamp) -> Result<(), SyncError> {
        let plaintext = serde_json::to_vec(&CursorPayload { applied }).unwrap();
        let sealed = aead::seal(self.sync_key.expose_secret()?, &plaintext, b"witflo.sync.cursor.v1")?;
        self.storage
            .write_atomic(layout::SYNC_CURSOR_FILE, &sealed)
            .await
            .map_err(witflo_vault::VaultError::from)?;
        Ok(())
    }
}

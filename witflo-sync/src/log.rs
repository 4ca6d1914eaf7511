//! Sync operation log: one encrypted, signed file per pending operation
//! under `sync/pending/<opId>.op.enc`.
//!
//! Grounded on `citadel-keystore::audit`'s `AuditSinkSync` trait and its
//! `FileAuditSink`/`InMemoryAuditSink` implementations, generalized from a
//! single append-only audit file to one file per operation (per
//! `spec.md` §4.11) while keeping the same sink-trait shape.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use witflo_primitives::{aead, sig, SyncKey};
use witflo_storage::StorageBackend;
use witflo_vault::layout;

use crate::clock::LamportTimestamp;
use crate::error::SyncError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncOperationKind {
    NoteCreated { note_id: Uuid },
    NoteUpdated { note_id: Uuid },
    NoteDeleted { note_id: Uuid },
    NotebookCreated { notebook_id: Uuid },
    NotebookDeleted { notebook_id: Uuid },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOperation {
    pub op_id: Uuid,
    pub timestamp: LamportTimestamp,
    pub kind: SyncOperationKind,
}

#[derive(Serialize, Deserialize)]
struct SignedOperation {
    operation: SyncOperation,
    signature: [u8; 64],
}

/// Encrypts and signs a `SyncOperation`, writing it to
/// `sync/pending/<opId>.op.enc`.
pub struct SyncLog {
    storage: Arc<dyn StorageBackend>,
    sync_key: SyncKey,
    signing: sig::SigningKeyPair,
}

impl SyncLog {
    pub fn new(storage: Arc<dyn StorageBackend>, sync_key: SyncKey, signing: sig::SigningKeyPair) -> Self {
        Self { storage, sync_key, signing }
    }

    pub async fn append(&self, operation: SyncOperation) -> Result<(), SyncError> {
        let signature = self.signing.sign(&serde_json::to_vec(&operation).unwrap());
        let signed = SignedOperation { operation: operation.clone(), signature };
        let plaintext = serde_json::to_vec(&signed).unwrap();
        let sealed = aead::seal(self.sync_key.expose_secret()?, &plaintext, operation.op_id.as_bytes())?;
        self.storage
            .write_atomic(&layout::pending_op_file(&operation.op_id.to_string()), &sealed)
            .await
            .map_err(witflo_vault::VaultError::from)?;
        info!(op_id = %operation.op_id, "sync operation appended");
        Ok(())
    }

    pub async fn read(&self, op_id: &Uuid, verifying_key: &[u8; 32]) -> Result<SyncOperation, SyncError> {
        let sealed = self
            .storage
            .read(&layout::pending_op_file(&op_id.to_string()))
            .await
            .map_err(witflo_vault::VaultError::from)?;
        let plaintext = aead::open(self.sync_key.expose_secret()?, &sealed, op_id.as_bytes())?;
        let signed: SignedOperation = serde_json::from_slice(plaintext.expose_secret()?)
            .map_err(|e| SyncError::Vault(witflo_vault::VaultError::HeaderCorrupt(e.to_string())))?;
        sig::verify(verifying_key, &serde_json::to_vec(&signed.operation).unwrap(), &signed.signature)?;
        Ok(signed.operation)
    }

    pub async fn list_pending(&self) -> Result<Vec<Uuid>, SyncError> {
        let names = self.storage.list(layout::SYNC_PENDING_DIR).await.map_err(witflo_vault::VaultError::from)?;
        Ok(names
            .into_iter()
            .filter_map(|n| n.strip_suffix(".op.enc").and_then(|id| Uuid::parse_str(id).ok()))
            .collect())
    }

    pub async fn acknowledge(&self, op_id: &Uuid) -> Result<(), SyncError> {
        self.storage
            .delete_file(&layout::pending_op_file(&op_id.to_string()))
            .await
            .map_err(witflo_vault::VaultError::from)?;
        Ok(())
    }
}

/// An in-memory mirror of pending operations, generalizing
/// `citadel-keystore::audit::InMemoryAuditSink` for tests that don't need a
/// real storage backend.
#[derive(Default)]
pub struct InMemorySyncLog {
    pub operations: std::sync::Mutex<HashMap<Uuid, SyncOperation>>,
}

impl InMemorySyncLog {
    pub fn record(&self, operation: SyncOperation) {
        self.operations.lock().unwrap().insert(operation.op_id, operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use witflo_storage::MemoryStorage;

    #[tokio::test]
    async fn append_then_read_roundtrips_and_verifies() {
        let signing = sig::SigningKeyPair::generate();
        let verifying = signing.verifying_key();
        let log = SyncLog::new(MemoryStorage::new(), SyncKey::from_bytes(vec![9u8; 32]), signing);

        let op = SyncOperation {
            op_id: Uuid::new_v4(),
            timestamp: LamportTimestamp { counter: 1, device_id: [0u8; 16] },
            kind: SyncOperationKind::NoteCreated { note_id: Uuid::new_v4() },
        };
        log.append(op.clone()).await.unwrap();

        let pending = log.list_pending().await.unwrap();
        assert_eq!(pending, vec![op.op_id]);

        let read_back = log.read(&op.op_id, &verifying).await.unwrap();
        assert_eq!(read_back.op_id, op.op_id);
    }

    #[tokio::test]
    async fn acknowledge_removes_the_pending_file() {
        let signing = sig::SigningKeyPair::generate();
        let log = SyncLog::new(MemoryStorage::new(), SyncKey::from_bytes(vec![9u8; 32]), signing);
        let op = SyncOperation {
            op_id: Uuid::new_v4(),
            timestamp: LamportTimestamp { counter: 1, device_id: [0u8; 16] },
            kind: SyncOperationKind::NoteDeleted { note_id: Uuid::new_v4() },
        };
        log.append(op.clone()).await.unwrap();
        log.acknowledge(&op.op_id).await.unwrap();
        assert!(log.list_pending().await.unwrap().is_empty());
    }
}

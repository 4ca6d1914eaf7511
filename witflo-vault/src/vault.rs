//! Vault lifecycle: create, unlock, lock, rekey.
//!
//! Grounded on `citadel-keystore::keystore::Keystore`'s shape — a service
//! struct holding an `Arc<dyn StorageBackend>`, async methods per
//! operation, and a state machine guarding which operations are valid.

use std::sync::Arc;

use tracing::{info, warn};
use witflo_primitives::kdf::{self, Argon2Params, SecurePassword};
use witflo_primitives::{aead, rand, Muk, VaultKey};
use witflo_storage::StorageBackend;

use crate::error::{OpenVaultError, VaultError};
use crate::header::{VaultHeader, VaultKeyWrap};
use crate::layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    Uninitialized,
    Locked,
    Unlocked,
    Error,
}

/// One vault directory. `storage` is rooted at the vault's own directory,
/// not the workspace root — callers scope it before constructing this.
pub struct Vault {
    storage: Arc<dyn StorageBackend>,
    header: VaultHeader,
    state: VaultState,
    key: Option<VaultKey>,
}

impl Vault {
    /// Creates a new vault directory whose key is random and sealed under
    /// the *workspace's* MUK rather than a vault-specific password — the
    /// default path (`spec.md` §3: "Vault key is random, not
    /// password-derived"), used by `WorkspaceService::add_vault`.
    pub async fn create_managed(
        storage: Arc<dyn StorageBackend>,
        vault_key: &VaultKey,
        muk: &Muk,
    ) -> Result<Self, VaultError> {
        let salt = rand::salt();
        let params = Argon2Params::conservative_default();
        let header = VaultHeader::new(params, salt, VaultKeyWrap::WorkspaceManaged);

        storage.write_atomic(layout::HEADER_FILE, &serde_json::to_vec(&header).unwrap()).await?;

        let sealed = aead::seal(muk.expose_secret()?, vault_key.expose_secret()?, header.vault_id.as_bytes())?;
        storage.write_atomic(layout::VAULT_KEY_FILE, &sealed).await?;

        Self::create_layout(&storage).await?;
        info!(vault_id = %header.vault_id, "workspace-managed vault created");

        Ok(Self {
            storage,
            header,
            state: VaultState::Unlocked,
            key: Some(VaultKey::from_bytes(vault_key.expose_secret()?.to_vec())),
        })
    }

    /// Unwraps a `WorkspaceManaged` vault's `vault.vk` under the workspace
    /// MUK supplied by the caller. Unlike the legacy password path, a
    /// mismatch here indicates keyring/vault desync rather than a routine
    /// wrong-password attempt, so it returns a bare `VaultError`.
    pub async fn unlock_managed(&mut self, muk: &Muk) -> Result<(), VaultError> {
        let sealed = self.storage.read(layout::VAULT_KEY_FILE).await?;
        let plaintext = aead::open(muk.expose_secret()?, &sealed, self.header.vault_id.as_bytes())?;
        self.key = Some(VaultKey::from_bytes(plaintext.expose_secret()?.to_vec()));
        self.state = VaultState::Unlocked;
        info!(vault_id = %self.header.vault_id, "vault unlocked (workspace-managed)");
        Ok(())
    }

    /// Creates a new vault directory sealing the vault key under a
    /// vault-specific password: the deprecated v1 per-vault password
    /// surface (`spec.md` §9), kept only as a read-only migration source.
    pub async fn create_legacy_password(
        storage: Arc<dyn StorageBackend>,
        password: SecurePassword,
    ) -> Result<Self, VaultError> {
        let salt = rand::salt();
        let params = Argon2Params::conservative_default();
        let header = VaultHeader::new(params, salt, VaultKeyWrap::LegacyPassword);

        storage.write_atomic(layout::HEADER_FILE, &serde_json::to_vec(&header).unwrap()).await?;

        let vault_key_bytes = rand::symmetric_key();
        let unwrap_key = kdf::derive_muk(password, &salt, params)?;
        let sealed = aead::seal(unwrap_key.expose_secret()?, &vault_key_bytes, header.vault_id.as_bytes())?;
        storage.write_atomic(layout::VAULT_KEY_FILE, &sealed).await?;

        Self::create_layout(&storage).await?;

        info!(vault_id = %header.vault_id, "legacy password-wrapped vault created");

        Ok(Self {
            storage,
            header,
            state: VaultState::Unlocked,
            key: Some(VaultKey::from_bytes(vault_key_bytes.to_vec())),
        })
    }

    async fn create_layout(storage: &Arc<dyn StorageBackend>) -> Result<(), VaultError> {
        storage.create_directory(layout::OBJECTS_DIR).await?;
        for dir in layout::object_fanout_dirs() {
            storage.create_directory(&dir).await?;
        }
        storage.create_directory(layout::REFS_DIR).await?;
        storage.create_directory(layout::SYNC_PENDING_DIR).await?;
        Ok(())
    }

    /// Loads an existing vault directory in the `Locked` state, reading and
    /// validating `vault.header` but not yet unwrapping `vault.vk`.
    pub async fn open(storage: Arc<dyn StorageBackend>) -> Result<Self, VaultError> {
        let raw = storage.read(layout::HEADER_FILE).await?;
        let header: VaultHeader =
            serde_json::from_slice(&raw).map_err(|e| VaultError::HeaderCorrupt(e.to_string()))?;

        if header.version > crate::header::CURRENT_VAULT_VERSION {
            return Err(VaultError::VersionMismatch {
                found: header.version,
                supported: crate::header::CURRENT_VAULT_VERSION,
            });
        }

        Ok(Self {
            storage,
            header,
            state: VaultState::Locked,
            key: None,
        })
    }

    pub fn state(&self) -> VaultState {
        self.state
    }

    pub fn header(&self) -> &VaultHeader {
        &self.header
    }

    /// Unwraps `vault.vk` under the password-derived key. Returns
    /// `OpenVaultError(InvalidVaultPassword)` on a wrong password, leaving
    /// the vault `Locked` rather than transitioning to `Error` — a failed
    /// unlock attempt is routine, not a corruption signal.
    pub async fn unlock_legacy_password(&mut self, password: SecurePassword) -> Result<(), OpenVaultError> {
        let sealed = self.storage.read(layout::VAULT_KEY_FILE).await.map_err(VaultError::from)?;
        let unwrap_key = kdf::derive_muk(password, &self.header.salt, self.header.kdf_params)
            .map_err(VaultError::from)?;
        let plaintext = aead::open(unwrap_key.expose_secret().map_err(VaultError::from)?, &sealed, self.header.vault_id.as_bytes())
            .map_err(VaultError::from)?;

        self.key = Some(VaultKey::from_bytes(plaintext.expose_secret().map_err(VaultError::from)?.to_vec()));
        self.state = VaultState::Unlocked;
        info!(vault_id = %self.header.vault_id, "vault unlocked");
        Ok(())
    }

    /// Seals the already-unwrapped vault key under a device-local symmetric
    /// key so a later open can skip the master password/MUK path entirely
    /// (`spec.md` §4.4's `device.key`, "device-wrapped VaultKey for fast
    /// unlock"). The device key itself — typically gated by the host's
    /// keychain or biometric prompt — is the caller's concern; this crate
    /// only seals and unseals bytes under it.
    pub async fn enroll_device_unlock(&self, device_key: &[u8; 32]) -> Result<(), VaultError> {
        let key_bytes = self.key.as_ref().ok_or(VaultError::NotUnlocked)?.expose_secret()?.to_vec();
        let sealed = aead::seal(device_key, &key_bytes, self.header.vault_id.as_bytes())?;
        self.storage.write_atomic(layout::DEVICE_KEY_FILE, &sealed).await?;
        info!(vault_id = %self.header.vault_id, "device fast-unlock enrolled");
        Ok(())
    }

    /// Unwraps `device.key` under `device_key`, bypassing the master
    /// password/MUK path. Fails with `VaultError::DeviceKeyNotEnrolled` if
    /// no `device.key` file is present.
    pub async fn unlock_via_device_key(&mut self, device_key: &[u8; 32]) -> Result<(), VaultError> {
        if !self.storage.exists(layout::DEVICE_KEY_FILE).await? {
            return Err(VaultError::DeviceKeyNotEnrolled);
        }
        let sealed = self.storage.read(layout::DEVICE_KEY_FILE).await?;
        let plaintext = aead::open(device_key, &sealed, self.header.vault_id.as_bytes())?;
        self.key = Some(VaultKey::from_bytes(plaintext.expose_secret()?.to_vec()));
        self.state = VaultState::Unlocked;
        info!(vault_id = %self.header.vault_id, "vault unlocked via device key");
        Ok(())
    }

    /// Removes `device.key`, revoking fast unlock. Idempotent: a vault that
    /// never enrolled one simply has nothing to delete.
    pub async fn revoke_device_unlock(&self) -> Result<(), VaultError> {
        if self.storage.exists(layout::DEVICE_KEY_FILE).await? {
            self.storage.delete_file(layout::DEVICE_KEY_FILE).await?;
        }
        Ok(())
    }

    /// Re-wraps `vault.vk` under the workspace MUK without changing the
    /// underlying `VaultKey`, flipping `key_wrap` from `LegacyPassword` to
    /// `WorkspaceManaged`. The v1→v2 workspace migration surface
    /// (`spec.md` §9) calls this once per vault after unwrapping it with
    /// its legacy password; every object encrypted under the unchanged
    /// `VaultKey` stays readable.
    pub async fn migrate_to_managed(&mut self, muk: &Muk) -> Result<(), VaultError> {
        if self.state != VaultState::Unlocked {
            return Err(VaultError::NotUnlocked);
        }
        let key_bytes = self.key.as_ref().ok_or(VaultError::NotUnlocked)?.expose_secret()?.to_vec();
        let sealed = aead::seal(muk.expose_secret()?, &key_bytes, self.header.vault_id.as_bytes())?;

        self.header.key_wrap = VaultKeyWrap::WorkspaceManaged;
        self.header.modified_at = Some(chrono::Utc::now());
        self.storage
            .write_atomic(layout::HEADER_FILE, &serde_json::to_vec(&self.header).unwrap())
            .await?;
        self.storage.write_atomic(layout::VAULT_KEY_FILE, &sealed).await?;
        info!(vault_id = %self.header.vault_id, "vault migrated from legacy password to workspace-managed wrapping");
        Ok(())
    }

    pub fn lock(&mut self) {
        if let Some(mut key) = self.key.take() {
            key.dispose();
        }
        self.state = VaultState::Locked;
        info!(vault_id = %self.header.vault_id, "vault locked");
    }

    pub fn vault_key(&self) -> Result<&VaultKey, VaultError> {
        if self.state != VaultState::Unlocked {
            return Err(VaultError::NotUnlocked);
        }
        self.key.as_ref().ok_or(VaultError::NotUnlocked)
    }

    /// Re-wraps `vault.vk` under a new password without changing the
    /// underlying `VaultKey` — every previously encrypted object remains
    /// readable.
    pub async fn change_vault_password(
        &mut self,
        old_password: SecurePassword,
        new_password: SecurePassword,
    ) -> Result<(), VaultError> {
        if self.state != VaultState::Unlocked {
            return Err(VaultError::NotUnlocked);
        }
        let old_unwrap = kdf::derive_muk(old_password, &self.header.salt, self.header.kdf_params)?;
        let sealed = self.storage.read(layout::VAULT_KEY_FILE).await?;
        aead::open(old_unwrap.expose_secret()?, &sealed, self.header.vault_id.as_bytes())?;

        let new_salt = rand::salt();
        let new_unwrap = kdf::derive_muk(new_password, &new_salt, self.header.kdf_params)?;
        let key_bytes = self.key.as_ref().ok_or(VaultError::NotUnlocked)?.expose_secret()?.to_vec();
        let resealed = aead::seal(new_unwrap.expose_secret()?, &key_bytes, self.header.vault_id.as_bytes())?;

        self.header.salt = new_salt;
        self.header.modified_at = Some(chrono::Utc::now());
        self.storage
            .write_atomic(layout::HEADER_FILE, &serde_json::to_vec(&self.header).unwrap())
            .await?;
        self.storage.write_atomic(layout::VAULT_KEY_FILE, &resealed).await?;
        warn!(vault_id = %self.header.vault_id, "vault password changed");
        Ok(())
    }
}

//! `.witflo-keyring.enc`: the per-workspace map of vault id to wrapped
//! `VaultKey`, sealed under the master unlock key.
//!
//! Grounded on `wojmat-The-Organizer::vault`'s save/load-with-key pair,
//! generalized from "one set of entries" to "one `VaultKey` per vault id".

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use witflo_primitives::{aead, Muk, VaultKey};

use crate::error::WorkspaceError;

/// On-disk keyring format version. `spec.md` §4.7/§6: every vault entry
/// carries its wrapped key and the display name that would otherwise have
/// to live in the plaintext workspace file.
const KEYRING_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct KeyringEntryWire {
    #[serde(with = "witflo_primitives::wire")]
    vault_key: [u8; 32],
    display_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct KeyringPayload {
    version: u32,
    vaults: HashMap<Uuid, KeyringEntryWire>,
}

/// A vault's unwrapped key plus the display metadata that, unlike the
/// plaintext `.witflo-workspace` vault registry, only exists behind the MUK.
pub struct KeyringEntry {
    pub vault_key: VaultKey,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Unwrapped keyring contents: each vault's root key and display name, held
/// only while the workspace is unlocked.
pub struct Keyring {
    entries: HashMap<Uuid, KeyringEntry>,
}

impl Keyring {
    pub fn empty() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn get(&self, vault_id: &Uuid) -> Option<&VaultKey> {
        self.entries.get(vault_id).map(|e| &e.vault_key)
    }

    pub fn get_entry(&self, vault_id: &Uuid) -> Option<&KeyringEntry> {
        self.entries.get(vault_id)
    }

    pub fn insert(&mut self, vault_id: Uuid, key: VaultKey, display_name: String) {
        self.entries.insert(vault_id, KeyringEntry { vault_key: key, display_name, created_at: Utc::now() });
    }

    pub fn remove(&mut self, vault_id: &Uuid) -> Option<VaultKey> {
        self.entries.remove(vault_id).map(|e| e.vault_key)
    }

    pub fn vault_ids(&self) -> Vec<Uuid> {
        self.entries.keys().copied().collect()
    }

    /// Seals the keyring under `muk`.
    ///
    /// SECURITY: reuses `nonce` across successive saves under the same MUK
    /// rather than generating a fresh one per save, per the open-question
    /// decision recorded in `SPEC_FULL.md` §9 — the nonce only changes when
    /// the master password (and therefore the MUK) changes.
    pub fn seal(&self, muk: &Muk, nonce: &[u8; aead::NONCE_LEN]) -> Result<Vec<u8>, WorkspaceError> {
        let mut vaults = HashMap::with_capacity(self.entries.len());
        for (id, entry) in &self.entries {
            let vault_key: [u8; 32] = entry
                .vault_key
                .expose_secret()?
                .try_into()
                .map_err(|_| WorkspaceError::KeyringCorrupt("vault key is not 32 bytes".into()))?;
            vaults.insert(
                *id,
                KeyringEntryWire { vault_key, display_name: entry.display_name.clone(), created_at: entry.created_at },
            );
        }
        let payload = KeyringPayload { version: KEYRING_VERSION, vaults };
        let plaintext = serde_json::to_vec(&payload).map_err(|e| WorkspaceError::KeyringCorrupt(e.to_string()))?;
        Ok(aead::seal_with_nonce(muk.expose_secret()?, nonce, &plaintext, b"witflo.keyring.v1")?)
    }

    pub fn unseal(sealed: &[u8], muk: &Muk, nonce: &[u8; aead::NONCE_LEN]) -> Result<Self, WorkspaceError> {
        let plaintext = aead::open_with_nonce(muk.expose_secret()?, nonce, sealed, b"witflo.keyring.v1")?;
        let payload: KeyringPayload = serde_json::from_slice(plaintext.expose_secret()?)
            .map_err(|e| WorkspaceError::KeyringCorrupt(e.to_string()))?;
        if payload.version > KEYRING_VERSION {
            return Err(WorkspaceError::KeyringCorrupt(format!("unsupported keyring version {}", payload.version)));
        }
        let entries = payload
            .vaults
            .into_iter()
            .map(|(id, wire)| {
                (
                    id,
                    KeyringEntry {
                        vault_key: VaultKey::from_bytes(wire.vault_key.to_vec()),
                        display_name: wire.display_name,
                        created_at: wire.created_at,
                    },
                )
            })
            .collect();
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use witflo_primitives::kdf::{derive_muk, Argon2Params, SecurePassword};

    fn test_muk() -> Muk {
        derive_muk(SecurePassword::new("master-pw".into()), &[9u8; 16], Argon2Params::conservative_default()).unwrap()
    }

    #[test]
    fn seal_unseal_roundtrips() {
        let muk = test_muk();
        let mut keyring = Keyring::empty();
        let vault_id = Uuid::new_v4();
        keyring.insert(vault_id, VaultKey::from_bytes(vec![7u8; 32]), "Personal".into());

        let nonce = witflo_primitives::rand::nonce();
        let sealed = keyring.seal(&muk, &nonce).unwrap();
        let unsealed = Keyring::unseal(&sealed, &muk, &nonce).unwrap();

        assert_eq!(unsealed.get(&vault_id).unwrap().expose_secret().unwrap(), &[7u8; 32]);
        assert_eq!(unsealed.get_entry(&vault_id).unwrap().display_name, "Personal");
    }

    #[test]
    fn wrong_muk_fails_to_unseal() {
        let muk = test_muk();
        let keyring = Keyring::empty();
        let nonce = witflo_primitives::rand::nonce();
        let sealed = keyring.seal(&muk, &nonce).unwrap();

        let wrong_muk =
            derive_muk(SecurePassword::new("different".into()), &[9u8; 16], Argon2Params::conservative_default())
                .unwrap();
        assert!(Keyring::unseal(&sealed, &wrong_muk, &nonce).is_err());
    }

    #[test]
    fn wrong_nonce_fails_to_unseal() {
        let muk = test_muk();
        let keyring = Keyring::empty();
        let nonce = witflo_primitives::rand::nonce();
        let sealed = keyring.seal(&muk, &nonce).unwrap();
        let other_nonce = witflo_primitives::rand::nonce();
        assert!(Keyring::unseal(&sealed, &muk, &other_nonce).is_err());
    }
}

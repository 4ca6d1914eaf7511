//! `.witflo-workspace`: plaintext JSON describing a workspace directory,
//! its KDF parameters, and the vaults registered in it. The only plaintext
//! file at the workspace root — `spec.md` §4.5/§6.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use witflo_primitives::kdf::Argon2Params;

pub const CURRENT_WORKSPACE_VERSION: u32 = 2;

/// A vault's entry in the plaintext workspace registry: just enough to find
/// its directory. The display name lives in the encrypted keyring instead
/// (`spec.md` §3/§6) — this file is read before the workspace is unlocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEntry {
    pub vault_id: Uuid,
    /// Path to the vault's directory, relative to the workspace root.
    pub path: String,
}

/// The `crypto` sub-object of workspace metadata: everything needed to
/// re-derive the MUK and unseal the keyring, all of it public (salts and
/// a nonce, never key material).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceCrypto {
    #[serde(with = "witflo_primitives::wire")]
    pub master_key_salt: [u8; 16],
    pub argon2_params: Argon2Params,
    /// Nonce the keyring is sealed under; reused across saves under the
    /// same MUK per the decision in `SPEC_FULL.md` §9, regenerated whenever
    /// the master password changes.
    #[serde(with = "witflo_primitives::wire")]
    pub keyring_nonce: [u8; 24],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceMetadata {
    pub version: u32,
    pub workspace_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    pub crypto: WorkspaceCrypto,
    pub vaults: Vec<VaultEntry>,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl WorkspaceMetadata {
    pub fn new(salt: [u8; 16], argon2_params: Argon2Params, keyring_nonce: [u8; 24]) -> Self {
        Self {
            version: CURRENT_WORKSPACE_VERSION,
            workspace_id: Uuid::new_v4(),
            created_at: Utc::now(),
            modified_at: None,
            crypto: WorkspaceCrypto { master_key_salt: salt, argon2_params, keyring_nonce },
            vaults: Vec::new(),
            extra: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkspaceMetadata {
        WorkspaceMetadata::new([3u8; 16], Argon2Params::conservative_default(), [4u8; 24])
    }

    #[test]
    fn roundtrips_through_json() {
        let meta = sample();
        let json = serde_json::to_vec(&meta).unwrap();
        let back: WorkspaceMetadata = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.workspace_id, meta.workspace_id);
        assert_eq!(back.version, CURRENT_WORKSPACE_VERSION);
        assert_eq!(back.crypto.master_key_salt, meta.crypto.master_key_salt);
        assert_eq!(back.crypto.keyring_nonce, meta.crypto.keyring_nonce);
    }

    #[test]
    fn salt_and_nonce_serialize_as_base64_strings_not_arrays() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("master_key_salt"));
        assert!(!json.contains("[3,3,3"));
    }
}

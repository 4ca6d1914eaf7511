//! `vault.header`: plaintext JSON metadata, and the sealed `vault.vk`
//! payload it describes the KDF parameters for.
//!
//! Field shape grounded on `citadel-keystore::types::KeyMetadata`
//! (versioned, timestamped, serde-derived, with a forward-compatible extra
//! map per the redesign note in `spec.md` §9).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use witflo_primitives::kdf::Argon2Params;

pub const CURRENT_VAULT_VERSION: u32 = 1;

/// How `vault.vk` is wrapped. `spec.md` §3 calls the vault key "random (not
/// password-derived)" — that is [`VaultKeyWrap::WorkspaceManaged`], the
/// default for every vault a current workspace creates. [`VaultKeyWrap::
/// LegacyPassword`] is the deprecated per-vault-password surface kept only
/// for migrating a v1 workspace (`spec.md` §9's "deprecated per-vault
/// password paths").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultKeyWrap {
    WorkspaceManaged,
    LegacyPassword,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultHeader {
    pub version: u32,
    pub vault_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default = "default_key_wrap")]
    pub key_wrap: VaultKeyWrap,
    /// KDF params for the legacy per-vault password unwrap key. Unused
    /// (but still present for schema stability) when `key_wrap` is
    /// `WorkspaceManaged`.
    pub kdf_params: Argon2Params,
    /// Salt for deriving the legacy vault-password unwrap key. 16 bytes,
    /// generated once at vault creation regardless of `key_wrap`.
    #[serde(with = "witflo_primitives::wire")]
    pub salt: [u8; 16],
    /// Forward-compatible extension point: unknown future fields round-trip
    /// through here instead of failing to parse.
    #[serde(default)]
    pub features: HashMap<String, String>,
}

fn default_key_wrap() -> VaultKeyWrap {
    VaultKeyWrap::LegacyPassword
}

impl VaultHeader {
    pub fn new(kdf_params: Argon2Params, salt: [u8; 16], key_wrap: VaultKeyWrap) -> Self {
        Self {
            version: CURRENT_VAULT_VERSION,
            vault_id: Uuid::new_v4(),
            created_at: Utc::now(),
            modified_at: None,
            key_wrap,
            kdf_params,
            salt,
            features: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrips_through_json() {
        let header = VaultHeader::new(
            Argon2Params::conservative_default(),
            [1u8; 16],
            VaultKeyWrap::WorkspaceManaged,
        );
        let json = serde_json::to_vec(&header).unwrap();
        let back: VaultHeader = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.vault_id, header.vault_id);
        assert_eq!(back.version, CURRENT_VAULT_VERSION);
        assert_eq!(back.key_wrap, VaultKeyWrap::WorkspaceManaged);
    }

    #[test]
    fn unknown_fields_fall_into_features_map_on_write_side() {
        let mut header = VaultHeader::new(
            Argon2Params::conservative_default(),
            [2u8; 16],
            VaultKeyWrap::LegacyPassword,
        );
        header.features.insert("color".into(), "blue".into());
        let json = serde_json::to_vec(&header).unwrap();
        let back: VaultHeader = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.features.get("color"), Some(&"blue".to_string()));
    }

    #[test]
    fn missing_key_wrap_field_defaults_to_legacy_password() {
        let header = VaultHeader::new(
            Argon2Params::conservative_default(),
            [3u8; 16],
            VaultKeyWrap::LegacyPassword,
        );
        let mut value: serde_json::Value = serde_json::to_value(&header).unwrap();
        value.as_object_mut().unwrap().remove("key_wrap");
        let back: VaultHeader = serde_json::from_value(value).unwrap();
        assert_eq!(back.key_wrap, VaultKeyWrap::LegacyPassword);
    }
}

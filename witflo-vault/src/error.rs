//! Vault-level error taxonomy.
//!
//! Per-operation error types wrap `VaultError`, the style
//! `citadel-keystore::error` uses for `GenerateError`/`RotateError`/etc.

use core::fmt;

use witflo_primitives::PrimitivesError;
use witflo_storage::StorageError;

#[derive(Debug)]
pub enum VaultError {
    HeaderCorrupt(String),
    VersionMismatch { found: u32, supported: u32 },
    NotUnlocked,
    InvalidVaultPassword,
    DeviceKeyNotEnrolled,
    VaultNotFound(String),
    ObjectNotFound(String),
    Primitives(PrimitivesError),
    Storage(StorageError),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderCorrupt(msg) => write!(f, "vault header corrupt: {msg}"),
            Self::VersionMismatch { found, supported } => {
                write!(f, "vault version {found} unsupported (this build supports {supported})")
            }
            Self::NotUnlocked => write!(f, "vault is not unlocked"),
            Self::InvalidVaultPassword => write!(f, "invalid vault password"),
            Self::DeviceKeyNotEnrolled => write!(f, "no device.key enrolled for fast unlock"),
            Self::VaultNotFound(id) => write!(f, "vault not found: {id}"),
            Self::ObjectNotFound(hash) => write!(f, "object not found: {hash}"),
            Self::Primitives(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<PrimitivesError> for VaultError {
    fn from(e: PrimitivesError) -> Self {
        match e {
            PrimitivesError::TagMismatch => Self::InvalidVaultPassword,
            other => Self::Primitives(other),
        }
    }
}

impl From<StorageError> for VaultError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// `open_vault` carries its own typed error since authentication failure
/// there is a routine, expected outcome rather than exceptional state.
#[derive(Debug)]
pub struct OpenVaultError(pub VaultError);

impl fmt::Display for OpenVaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for OpenVaultError {}

impl From<VaultError> for OpenVaultError {
    fn from(e: VaultError) -> Self {
        Self(e)
    }
}

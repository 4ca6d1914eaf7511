use core::fmt;

use witflo_primitives::PrimitivesError;
use witflo_storage::StorageError;
use witflo_vault::VaultError;

#[derive(Debug)]
pub enum WorkspaceError {
    AlreadyInitialized,
    NotAWorkspace,
    UnsupportedVersion { found: u32, supported: u32 },
    InvalidMasterPassword,
    KeyringCorrupt(String),
    NotUnlocked,
    LastVaultProtected,
    PartialDeletion(String),
    MigrationFailed(String),
    VaultNotFound(String),
    Vault(VaultError),
    Storage(StorageError),
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "directory is already a workspace"),
            Self::NotAWorkspace => write!(f, "directory is not a workspace"),
            Self::UnsupportedVersion { found, supported } => {
                write!(f, "workspace version {found} unsupported (this build supports {supported})")
            }
            Self::InvalidMasterPassword => write!(f, "invalid master password"),
            Self::KeyringCorrupt(msg) => write!(f, "workspace keyring corrupt: {msg}"),
            Self::NotUnlocked => write!(f, "workspace is not unlocked"),
            Self::LastVaultProtected => write!(f, "cannot remove the last vault in a workspace"),
            Self::PartialDeletion(msg) => write!(f, "vault deletion left the workspace inconsistent: {msg}"),
            Self::MigrationFailed(step) => write!(f, "migration failed at step: {step}"),
            Self::VaultNotFound(id) => write!(f, "vault not found: {id}"),
            Self::Vault(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WorkspaceError {}

impl From<VaultError> for WorkspaceError {
    fn from(e: VaultError) -> Self {
        Self::Vault(e)
    }
}

impl From<StorageError> for WorkspaceError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<PrimitivesError> for WorkspaceError {
    fn from(e: PrimitivesError) -> Self {
        match e {
            PrimitivesError::TagMismatch => Self::InvalidMasterPassword,
            other => Self::Vault(VaultError::Primitives(other)),
        }
    }
}

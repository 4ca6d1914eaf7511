use core::fmt;

use witflo_primitives::PrimitivesError;
use witflo_vault::VaultError;

#[derive(Debug)]
pub enum SyncError {
    Vault(VaultError),
    Watch(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vault(e) => write!(f, "{e}"),
            Self::Watch(msg) => write!(f, "file watcher error: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<VaultError> for SyncError {
    fn from(e: VaultError) -> Self {
        Self::Vault(e)
    }
}

impl From<PrimitivesError> for SyncError {
    fn from(e: PrimitivesError) -> Self {
        Self::Vault(VaultError::from(e))
    }
}

impl From<notify::Error> for SyncError {
    fn from(e: notify::Error) -> Self {
        Self::Watch(e.to_string())
    }
}

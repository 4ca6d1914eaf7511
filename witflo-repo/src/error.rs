use core::fmt;

use witflo_primitives::PrimitivesError;
use witflo_vault::VaultError;

#[derive(Debug)]
pub enum RepoError {
    IndexCorrupt(String),
    NotFound(String),
    Vault(VaultError),
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexCorrupt(msg) => write!(f, "metadata index corrupt: {msg}"),
            Self::NotFound(id) => write!(f, "not found: {id}"),
            Self::Vault(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RepoError {}

impl From<VaultError> for RepoError {
    fn from(e: VaultError) -> Self {
        Self::Vault(e)
    }
}

impl From<PrimitivesError> for RepoError {
    fn from(e: PrimitivesError) -> Self {
        Self::Vault(VaultError::from(e))
    }
}

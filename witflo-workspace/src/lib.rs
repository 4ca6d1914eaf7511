//! Workspace keyring, vault registry, and session auto-lock.

pub mod error;
pub mod keyring;
pub mod metadata;
pub mod session;
pub mod settings;
pub mod workspace;

pub use error::WorkspaceError;
pub use keyring::{Keyring, KeyringEntry};
pub use metadata::{VaultEntry, WorkspaceMetadata};
pub use session::{AutoLockDuration, LockCause, Session, SessionState};
pub use settings::WorkspaceSettings;
pub use workspace::{Workspace, WorkspaceState};

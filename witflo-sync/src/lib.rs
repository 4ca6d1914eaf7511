//! Sync operation log, Lamport ordering, and the debounced file watcher.

pub mod clock;
pub mod cursor;
pub mod error;
pub mod log;
pub mod watcher;

pub use clock::{LamportClock, LamportTimestamp};
pub use cursor::SyncCursor;
pub use error::SyncError;
pub use log::{InMemorySyncLog, SyncLog, SyncOperation, SyncOperationKind};
pub use watcher::{classify, VaultWatcher, WatchDispatcher, WatchedChange};

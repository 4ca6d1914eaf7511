//! Encrypted note and notebook repositories over an unlocked vault.

pub mod error;
pub mod index;
pub mod note;
pub mod notebook;
pub mod search_index;
pub mod tag_index;

pub use error::RepoError;
pub use note::{NoteId, NoteMetadata, NoteRepository};
pub use notebook::{NotebookId, NotebookMetadata, NotebookRepository};
pub use search_index::SearchIndexFile;
pub use tag_index::TagIndex;

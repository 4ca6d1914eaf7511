//! On-disk path scheme for a vault directory.
//!
//! No teacher file describes a filesystem layout directly; this is built on
//! `witflo_storage`'s path-based backend and `spec.md` §4.4's named files.

use witflo_primitives::hash;

pub const HEADER_FILE: &str = "vault.header";
pub const VAULT_KEY_FILE: &str = "vault.vk";
pub const DEVICE_KEY_FILE: &str = "device.key";
pub const OBJECTS_DIR: &str = "objects";
pub const REFS_DIR: &str = "refs";
/// Encrypted blind-index file backing `SearchKey`-derived lookups, per
/// `spec.md` §4.10 — the derivation and file shape are implemented, not a
/// tokenizer or query planner.
pub const SEARCH_INDEX_FILE: &str = "refs/search.db.enc";
pub const SYNC_DIR: &str = "sync";
pub const SYNC_CURSOR_FILE: &str = "sync/cursor.enc";
pub const SYNC_PENDING_DIR: &str = "sync/pending";

/// Path of a content-addressed object under `objects/<hh>/<rest>`, where
/// `hash` is the BLAKE3 digest of the *ciphertext*.
pub fn object_path(hash: &[u8; 32]) -> String {
    let (hh, rest) = hash::object_path_fragment(hash);
    format!("{OBJECTS_DIR}/{hh}/{rest}")
}

pub fn refs_file(name: &str) -> String {
    format!("{REFS_DIR}/{name}.jsonl.enc")
}

pub fn pending_op_file(op_id: &str) -> String {
    format!("{SYNC_PENDING_DIR}/{op_id}.op.enc")
}

/// The 256 two-hex-digit fan-out directories created eagerly under
/// `objects/` at vault init, bounding the number of entries any one
/// directory can accumulate.
pub fn object_fanout_dirs() -> impl Iterator<Item = String> {
    (0u16..256).map(|b| format!("{OBJECTS_DIR}/{:02x}", b))
}

//! In-memory metadata cache backing note/notebook listing queries.
//!
//! New; grounded on the listing shape implied by
//! `citadel-keystore::keystore::Keystore::{list_keys,list_by_state,list_by_parent}`
//! — an in-memory index rebuilt from the encrypted `refs/*.jsonl.enc` file
//! on unlock, read from directly for queries, and persisted back on write.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

pub struct MetadataCache<T> {
    entries: HashMap<Uuid, T>,
}

impl<T> MetadataCache<T> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn get(&self, id: &Uuid) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    pub fn insert(&mut self, id: Uuid, value: T) {
        self.entries.insert(id, value);
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<T> {
        self.entries.remove(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone + Serialize> MetadataCache<T> {
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.values().cloned().collect()
    }
}

impl<T> Default for MetadataCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebuilds a cache from a decrypted `refs/*.jsonl.enc` snapshot, keyed by
/// whatever field the caller extracts an id from. `spec.md` §6 requires the
/// decrypted payload to be JSONL (one JSON record per line), not a single
/// JSON array — blank lines (a trailing newline, say) are skipped.
pub fn rebuild<T: DeserializeOwned>(plaintext: &[u8], id_of: impl Fn(&T) -> Uuid) -> Result<MetadataCache<T>, serde_json::Error> {
    let mut cache = MetadataCache::new();
    for line in plaintext.split(|&b| b == b'\n') {
        if line.is_empty() {
            continue;
        }
        let item: T = serde_json::from_slice(line)?;
        let id = id_of(&item);
        cache.insert(id, item);
    }
    Ok(cache)
}

/// Encodes a snapshot as JSONL — one `serde_json::to_vec` record per line,
/// joined by `\n` — the bit-exact on-disk shape `spec.md` §6 specifies for
/// every `refs/*.jsonl.enc` file once decrypted.
pub fn to_jsonl<T: Serialize>(items: &[T]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        out.extend(serde_json::to_vec(item)?);
    }
    Ok(out)
}

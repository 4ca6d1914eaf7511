//! Zeroizing owned secrets and the typed key newtypes built on top of them.

use std::cell::Cell;
use std::fmt;

use zeroize::Zeroizing;

use crate::error::PrimitivesError;
use crate::{hkdf, kex, sig};

/// An owned, zeroize-on-drop byte buffer with an explicit disposed flag.
///
/// `expose_secret` is the one accessor that reaches the raw bytes; every
/// other method on this type and the newtypes wrapping it goes through it,
/// so a used-after-dispose bug surfaces at the call site that needed the
/// secret, not somewhere downstream.
pub struct SecureBytes {
    inner: Zeroizing<Vec<u8>>,
    disposed: Cell<bool>,
}

impl SecureBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Zeroizing::new(bytes),
            disposed: Cell::new(false),
        }
    }

    pub fn expose_secret(&self) -> Result<&[u8], PrimitivesError> {
        if self.disposed.get() {
            return Err(PrimitivesError::UseAfterDispose);
        }
        Ok(&self.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Zeroizes the buffer immediately and marks it disposed. Idempotent.
    pub fn dispose(&mut self) {
        self.inner.iter_mut().for_each(|b| *b = 0);
        self.disposed.set(true);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl Clone for SecureBytes {
    fn clone(&self) -> Self {
        // A disposed source has no secret left to copy; produce an
        // independently-disposed clone rather than panicking.
        if self.disposed.get() {
            let mut c = SecureBytes::new(vec![0u8; self.inner.len()]);
            c.dispose();
            return c;
        }
        SecureBytes::new(self.inner.to_vec())
    }
}

impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBytes")
            .field("len", &self.inner.len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

macro_rules! typed_key {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name(pub(crate) SecureBytes);

        impl $name {
            pub fn from_bytes(bytes: Vec<u8>) -> Self {
                Self(SecureBytes::new(bytes))
            }

            pub fn expose_secret(&self) -> Result<&[u8], PrimitivesError> {
                self.0.expose_secret()
            }

            pub fn dispose(&mut self) {
                self.0.dispose()
            }

            pub fn is_disposed(&self) -> bool {
                self.0.is_disposed()
            }
        }
    };
}

typed_key!(Muk, "Master unlock key, derived from the master password via Argon2id.");
typed_key!(VaultKey, "Per-vault root key, unwrapped from the workspace keyring.");
typed_key!(ContentKey, "Per-note key, derived from a `VaultKey` via HKDF.");
typed_key!(NotebookKey, "Per-notebook key, derived from a `VaultKey` via HKDF.");
typed_key!(SearchKey, "Blind-index key for the encrypted search index.");
typed_key!(TagIndexKey, "Key used to encrypt the tag -> note id index.");
typed_key!(SyncKey, "Key used to encrypt sync operation-log payloads.");

/// Canonical HKDF context strings. Keep in lockstep with `spec.md` §4.2 —
/// changing these invalidates every key derived under the old one.
pub mod context {
    pub fn content(note_id: &str) -> String {
        format!("witflo.content.{note_id}.v1")
    }

    pub fn notebook(notebook_id: &str) -> String {
        format!("witflo.notebook.{notebook_id}.v1")
    }

    /// Reserved for shared-workspace groups; no `Group` entity exists yet in
    /// this crate, but the context string is part of the façade's fixed
    /// contract (`spec.md` §4.1) and must not be reused for anything else.
    pub fn group(id: &str) -> String {
        format!("witflo.group.{id}.v1")
    }

    /// Reserved for note-sharing links; see [`group`].
    pub fn share(id: &str) -> String {
        format!("witflo.share.{id}.v1")
    }

    pub const SEARCH: &str = "witflo.search.index.v1";
    pub const TAGS: &str = "witflo.tags.index.v1";
    pub const SYNC: &str = "witflo.sync.v1";
}

impl VaultKey {
    pub fn derive_content(&self, note_id: &str) -> Result<ContentKey, PrimitivesError> {
        let raw = hkdf::expand(self.expose_secret()?, &context::content(note_id), 32)?;
        Ok(ContentKey(raw))
    }

    pub fn derive_notebook(&self, notebook_id: &str) -> Result<NotebookKey, PrimitivesError> {
        let raw = hkdf::expand(self.expose_secret()?, &context::notebook(notebook_id), 32)?;
        Ok(NotebookKey(raw))
    }

    pub fn derive_search(&self) -> Result<SearchKey, PrimitivesError> {
        let raw = hkdf::expand(self.expose_secret()?, context::SEARCH, 32)?;
        Ok(SearchKey(raw))
    }

    pub fn derive_tag_index(&self) -> Result<TagIndexKey, PrimitivesError> {
        let raw = hkdf::expand(self.expose_secret()?, context::TAGS, 32)?;
        Ok(TagIndexKey(raw))
    }

    pub fn derive_sync(&self) -> Result<SyncKey, PrimitivesError> {
        let raw = hkdf::expand(self.expose_secret()?, context::SYNC, 32)?;
        Ok(SyncKey(raw))
    }
}

/// An Ed25519 device identity keypair, generated once per workspace and
/// stored (wrapped) alongside the keyring.
pub struct DeviceIdentity {
    pub signing: sig::SigningKeyPair,
}

/// An X25519 keypair used for future device-to-device key exchange.
pub struct DeviceExchangeKey {
    pub exchange: kex::ExchangeKeyPair,
}

//! Cryptographic primitives for Witflo's vault core.
//!
//! This crate has no I/O and no async: it is the façade every higher crate
//! builds on, the same role `citadel_envelope` plays for `citadel-keystore`
//! in its lineage. Operations are grouped into modules rather than hung off
//! a façade object, since that is how the teacher crate already exposes
//! `aead`/`kdf` as free functions.
//!
//! # Quick start
//!
//! ```
//! use witflo_primitives::{aead, rand};
//!
//! let key = rand::symmetric_key();
//! let sealed = aead::seal(&key, b"plaintext", b"").unwrap();
//! let opened = aead::open(&key, &sealed, b"").unwrap();
//! assert_eq!(opened.expose_secret().unwrap(), b"plaintext");
//! ```

pub mod aead;
pub mod error;
pub mod hash;
pub mod hkdf;
pub mod kdf;
pub mod kex;
pub mod rand;
pub mod secure_bytes;
pub mod sig;
pub mod wire;

pub use error::PrimitivesError;
pub use secure_bytes::{
    context, ContentKey, DeviceExchangeKey, DeviceIdentity, Muk, NotebookKey, SearchKey,
    SecureBytes, SyncKey, TagIndexKey, VaultKey,
};

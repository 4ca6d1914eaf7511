//! XChaCha20-Poly1305 AEAD façade.
//!
//! Grounded on `wojmat-The-Organizer::vault`'s nonce-then-ciphertext layout
//! and on `citadel_envelope::aead`'s module-of-free-functions shape.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};

use crate::error::PrimitivesError;
use crate::rand;
use crate::secure_bytes::SecureBytes;

pub const NONCE_LEN: usize = 24;
pub const KEY_LEN: usize = 32;
pub const TAG_LEN: usize = 16;

fn cipher(key: &[u8]) -> Result<XChaCha20Poly1305, PrimitivesError> {
    if key.len() != KEY_LEN {
        return Err(PrimitivesError::InvalidParams(format!(
            "aead key must be {KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    Ok(XChaCha20Poly1305::new(Key::from_slice(key)))
}

/// Encrypts `plaintext`, generating a fresh random nonce and prepending it
/// to the returned ciphertext: `nonce || ciphertext || tag`.
pub fn seal(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, PrimitivesError> {
    let nonce = rand::nonce();
    seal_with_nonce(key, &nonce, plaintext, aad)
}

/// Encrypts `plaintext` under an explicit, caller-supplied nonce. Unlike
/// [`seal`], the nonce is NOT prepended to the output — the caller is
/// responsible for storing it alongside the ciphertext (e.g. the workspace
/// keyring nonce lives in `.witflo-workspace`, not in
/// `.witflo-keyring.enc`).
///
/// SECURITY: the workspace keyring (§4.8) intentionally reuses the same
/// nonce across successive saves under one MUK rather than generating a
/// fresh one — this is the sole caller of this variant outside tests. Do
/// not reuse a nonce under any other key.
pub fn seal_with_nonce(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, PrimitivesError> {
    let cipher = cipher(key)?;
    cipher
        .encrypt(XNonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| PrimitivesError::InvalidParams("aead encryption failed".into()))
}

/// Decrypts a `nonce || ciphertext || tag` blob produced by [`seal`].
pub fn open(key: &[u8], sealed: &[u8], aad: &[u8]) -> Result<SecureBytes, PrimitivesError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(PrimitivesError::ShortInput);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    open_with_nonce(key, nonce.try_into().expect("split at NONCE_LEN"), ciphertext, aad)
}

/// Decrypts a bare ciphertext (no nonce prefix) under an explicit nonce,
/// the counterpart to [`seal_with_nonce`].
pub fn open_with_nonce(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<SecureBytes, PrimitivesError> {
    if ciphertext.len() < TAG_LEN {
        return Err(PrimitivesError::ShortInput);
    }
    let cipher = cipher(key)?;
    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| PrimitivesError::TagMismatch)?;
    Ok(SecureBytes::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = rand::symmetric_key();
        let sealed = seal(&key, b"hello vault", b"aad").unwrap();
        let opened = open(&key, &sealed, b"aad").unwrap();
        assert_eq!(opened.expose_secret().unwrap(), b"hello vault");
    }

    #[test]
    fn bit_flip_fails_authentication() {
        let key = rand::symmetric_key();
        let mut sealed = seal(&key, b"hello vault", b"aad").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert_eq!(open(&key, &sealed, b"aad").unwrap_err(), PrimitivesError::TagMismatch);
    }

    #[test]
    fn wrong_aad_fails() {
        let key = rand::symmetric_key();
        let sealed = seal(&key, b"hello vault", b"aad-a").unwrap();
        assert!(open(&key, &sealed, b"aad-b").is_err());
    }

    #[test]
    fn explicit_nonce_roundtrips_without_a_prefix() {
        let key = rand::symmetric_key();
        let nonce = rand::nonce();
        let sealed = seal_with_nonce(&key, &nonce, b"keyring payload", b"").unwrap();
        let opened = open_with_nonce(&key, &nonce, &sealed, b"").unwrap();
        assert_eq!(opened.expose_secret().unwrap(), b"keyring payload");
    }

    #[test]
    fn wrong_nonce_fails_to_open() {
        let key = rand::symmetric_key();
        let nonce = rand::nonce();
        let sealed = seal_with_nonce(&key, &nonce, b"keyring payload", b"").unwrap();
        let other_nonce = rand::nonce();
        assert!(open_with_nonce(&key, &other_nonce, &sealed, b"").is_err());
    }

    proptest::proptest! {
        #[test]
        fn seal_open_roundtrips_for_arbitrary_plaintext(plaintext in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..512)) {
            let key = rand::symmetric_key();
            let sealed = seal(&key, &plaintext, b"").unwrap();
            let opened = open(&key, &sealed, b"").unwrap();
            proptest::prop_assert_eq!(opened.expose_secret().unwrap(), plaintext.as_slice());
        }

        #[test]
        fn any_single_bit_flip_fails_authentication(
            plaintext in proptest::collection::vec(proptest::prelude::any::<u8>(), 1..128),
            flip_index in 0usize..24,
        ) {
            let key = rand::symmetric_key();
            let mut sealed = seal(&key, &plaintext, b"").unwrap();
            let idx = flip_index % sealed.len();
            sealed[idx] ^= 0x01;
            proptest::prop_assert!(open(&key, &sealed, b"").is_err());
        }
    }
}

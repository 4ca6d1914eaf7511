//! CSPRNG helpers, grounded on `citadel_envelope`'s use of
//! `rand_core::OsRng`/`getrandom` for salts, nonces, and keys.

use rand::rngs::OsRng as RandOsRng;
use rand::RngCore;
use rand_core::OsRng as RandCoreOsRng;

use crate::aead::NONCE_LEN;

/// An `OsRng` compatible with the `rand_core` trait versions `ed25519-dalek`
/// and `x25519-dalek` expect.
pub fn os_rng() -> RandCoreOsRng {
    RandCoreOsRng
}

pub fn bytes(len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    RandOsRng.fill_bytes(&mut out);
    out
}

pub fn salt() -> [u8; 16] {
    let mut out = [0u8; 16];
    RandOsRng.fill_bytes(&mut out);
    out
}

pub fn nonce() -> [u8; NONCE_LEN] {
    let mut out = [0u8; NONCE_LEN];
    RandOsRng.fill_bytes(&mut out);
    out
}

pub fn symmetric_key() -> [u8; 32] {
    let mut out = [0u8; 32];
    RandOsRng.fill_bytes(&mut out);
    out
}

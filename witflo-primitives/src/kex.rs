//! X25519 key exchange, reserved for future device-to-device sync transport.
//!
//! Not exercised by the local vault/workspace/sync machinery today; present
//! because `spec.md` §4.1 lists it as a primitive the core exposes.

use x25519_dalek::{PublicKey, StaticSecret};

use crate::rand::os_rng;

pub struct ExchangeKeyPair {
    secret: StaticSecret,
}

impl ExchangeKeyPair {
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(os_rng()),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        *PublicKey::from(&self.secret).as_bytes()
    }

    pub fn diffie_hellman(&self, their_public: &[u8; 32]) -> [u8; 32] {
        *self.secret.diffie_hellman(&PublicKey::from(*their_public)).as_bytes()
    }
}

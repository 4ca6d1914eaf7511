//! Ed25519 device-identity signing, used to sign sync operation-log entries.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::PrimitivesError;
use crate::rand::os_rng;

pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl SigningKeyPair {
    pub fn generate() -> Self {
        let mut rng = os_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn verifying_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

pub fn verify(verifying_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> Result<(), PrimitivesError> {
    let vk = VerifyingKey::from_bytes(verifying_key)
        .map_err(|_| PrimitivesError::InvalidParams("invalid ed25519 verifying key".into()))?;
    let sig = Signature::from_bytes(signature);
    vk.verify(message, &sig).map_err(|_| PrimitivesError::TagMismatch)
}

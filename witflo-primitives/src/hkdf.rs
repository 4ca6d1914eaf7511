//! HKDF-SHA256 context expansion.
//!
//! Grounded on `citadel_envelope::kdf::derive_key`, which already wraps
//! `Hkdf::<Sha256>` for this exact purpose; here the `info` parameter is a
//! plain canonical context string (see [`crate::secure_bytes::context`])
//! rather than a TLV-encoded protocol identifier.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::PrimitivesError;
use crate::secure_bytes::SecureBytes;

/// Expands `key` into `out_len` bytes of key material scoped to `context`.
pub fn expand(key: &[u8], context: &str, out_len: usize) -> Result<SecureBytes, PrimitivesError> {
    let hk = Hkdf::<Sha256>::new(None, key);
    let mut out = vec![0u8; out_len];
    hk.expand(context.as_bytes(), &mut out)
        .map_err(|_| PrimitivesError::InvalidParams("hkdf output length".into()))?;
    Ok(SecureBytes::new(out))
}

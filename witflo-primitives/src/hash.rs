//! BLAKE3 content addressing.

/// Hashes `bytes` (the ciphertext, never the plaintext) for use as an
/// object store key.
pub fn blake3(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}

/// Formats a hash as the `<hh>/<rest>` two-level path fragment used under
/// `objects/` (`hh` is the first byte, hex-encoded).
pub fn object_path_fragment(hash: &[u8; 32]) -> (String, String) {
    let hex = hex::encode(hash);
    (hex[..2].to_string(), hex[2..].to_string())
}

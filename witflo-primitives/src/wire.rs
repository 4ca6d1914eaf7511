//! Base64 (de)serialization helpers for the plaintext on-disk formats
//! (`spec.md` §6): workspace metadata and vault headers encode their salts
//! and nonces as base64 strings rather than JSON number arrays.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S, const N: usize>(bytes: &[u8; N], ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    STANDARD.encode(bytes).serialize(ser)
}

pub fn deserialize<'de, D, const N: usize>(de: D) -> Result<[u8; N], D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(de)?;
    let decoded = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| serde::de::Error::custom(format!("invalid base64: {e}")))?;
    decoded
        .try_into()
        .map_err(|v: Vec<u8>| serde::de::Error::custom(format!("expected {N} bytes, got {}", v.len())))
}

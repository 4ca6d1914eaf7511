//! Argon2id master-key derivation.
//!
//! Grounded on `wojmat-The-Organizer::vault::derive_key`, generalized with
//! a configurable [`Argon2Params`] and a `benchmark` helper in place of the
//! teacher's hardcoded constants.

use std::time::Instant;

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use crate::error::PrimitivesError;
use crate::secure_bytes::Muk;

/// Argon2id tuning parameters, persisted in the vault header alongside the
/// salt so a vault remains openable even if the recommended defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Used when benchmarking fails or produces a degenerate result:
    /// 64 MiB memory, 3 iterations, single-threaded.
    pub fn conservative_default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

/// A master password, held only long enough to derive the MUK.
pub struct SecurePassword(Zeroizing<Vec<u8>>);

impl SecurePassword {
    pub fn new(password: String) -> Self {
        Self(Zeroizing::new(password.into_bytes()))
    }
}

/// Derives the master unlock key from a password and salt under the given
/// parameters.
pub fn derive_muk(
    password: SecurePassword,
    salt: &[u8; 16],
    params: Argon2Params,
) -> Result<Muk, PrimitivesError> {
    let argon2_params = Params::new(params.memory_kib, params.iterations, params.parallelism, Some(32))
        .map_err(|e| PrimitivesError::InvalidParams(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(&password.0, salt, &mut key)
        .map_err(|e| PrimitivesError::InvalidParams(format!("argon2: {e}")))?;

    Ok(Muk::from_bytes(key.to_vec()))
}

/// Step-searches Argon2id memory cost (doubling from `min_mem_kib`, capped
/// at `max_mem_kib`) at a fixed low iteration count until the measured
/// per-derivation time would exceed `target_ms`, then solves for iteration
/// count to approach `target_ms` at the chosen memory cost.
///
/// Deterministic given fixed host throughput: it is driven purely by wall
/// clock measurement, not randomness.
pub fn benchmark(target_ms: u32, min_mem_kib: u32, max_mem_kib: u32) -> Argon2Params {
    let probe_iterations = 1;
    let mut memory_kib = min_mem_kib.max(8 * 1024);
    let mut probe_ms = time_derivation(memory_kib, probe_iterations);

    while probe_ms < target_ms as u128 && memory_kib < max_mem_kib {
        memory_kib = (memory_kib * 2).min(max_mem_kib);
        probe_ms = time_derivation(memory_kib, probe_iterations);
    }

    if probe_ms == 0 {
        return Argon2Params::conservative_default();
    }

    let iterations = ((target_ms as u128 * probe_iterations as u128) / probe_ms.max(1)).max(1) as u32;

    Argon2Params {
        memory_kib,
        iterations: iterations.max(1),
        parallelism: 1,
    }
}

fn time_derivation(memory_kib: u32, iterations: u32) -> u128 {
    let params = match Params::new(memory_kib, iterations, 1, Some(32)) {
        Ok(p) => p,
        Err(_) => return 0,
    };
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = [0u8; 16];
    let mut out = [0u8; 32];
    let start = Instant::now();
    let _ = argon2.hash_password_into(b"benchmark-probe", &salt, &mut out);
    start.elapsed().as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic_for_same_inputs() {
        let salt = [7u8; 16];
        let params = Argon2Params::conservative_default();
        let a = derive_muk(SecurePassword::new("correct horse".into()), &salt, params).unwrap();
        let b = derive_muk(SecurePassword::new("correct horse".into()), &salt, params).unwrap();
        assert_eq!(a.expose_secret().unwrap(), b.expose_secret().unwrap());
    }

    #[test]
    fn different_passwords_derive_different_keys() {
        let salt = [7u8; 16];
        let params = Argon2Params::conservative_default();
        let a = derive_muk(SecurePassword::new("password-a".into()), &salt, params).unwrap();
        let b = derive_muk(SecurePassword::new("password-b".into()), &salt, params).unwrap();
        assert_ne!(a.expose_secret().unwrap(), b.expose_secret().unwrap());
    }
}

//! Error taxonomy for the primitives façade.

use core::fmt;

/// Errors surfaced by `witflo_primitives`.
///
/// Mirrors the leaf errors of the taxonomy: every higher crate wraps this
/// with `From<PrimitivesError>` rather than matching on it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitivesError {
    /// KDF or AEAD parameters were out of the accepted range.
    InvalidParams(String),
    /// AEAD authentication failed (wrong key, wrong nonce, or tampering).
    TagMismatch,
    /// An input buffer was shorter than the operation requires.
    ShortInput,
    /// A `SecureBytes`-backed value was accessed after `dispose()`.
    UseAfterDispose,
}

impl fmt::Display for PrimitivesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParams(msg) => write!(f, "invalid parameters: {msg}"),
            Self::TagMismatch => write!(f, "authentication tag mismatch"),
            Self::ShortInput => write!(f, "input buffer too short"),
            Self::UseAfterDispose => write!(f, "use of secret after dispose"),
        }
    }
}

impl std::error::Error for PrimitivesError {}

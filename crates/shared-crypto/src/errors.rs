//! # Crypto Error Types

use thiserror::Error;

/// Errors raised by signing, recovery and proof verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Secret key bytes do not form a valid scalar.
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Signature bytes are malformed or non-canonical.
    #[error("Invalid signature")]
    InvalidSignature,

    /// No public key could be recovered from the signature.
    #[error("Signature recovery failed")]
    RecoveryFailed,

    /// A VRF proof did not verify against the claimed sender.
    #[error("Invalid proof")]
    InvalidProof,
}

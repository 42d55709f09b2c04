//! # Recoverable secp256k1 Keys
//!
//! Signing produces the ledger's 65-byte `r ‖ s ‖ v` envelope over a 32-byte
//! prehash (the entity's Keccak identity); verification is recovery plus an
//! address comparison, so no public key ever travels on the wire.

use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use shared_types::{keccak256, Address, SignatureRSV, H256};
use zeroize::Zeroize;

/// A secp256k1 keypair identified by its 20-byte ledger address.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// The ledger address: low 20 bytes of Keccak-256 over the uncompressed
    /// public key.
    pub fn address(&self) -> Address {
        address_from_public(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte prehash, producing the recoverable envelope.
    pub fn sign(&self, prehash: &H256) -> Result<SignatureRSV, CryptoError> {
        let (sig, recid): (Signature, RecoveryId) = self
            .signing_key
            .sign_prehash_recoverable(prehash.as_bytes())
            .map_err(|_| CryptoError::InvalidSignature)?;
        let bytes = sig.to_bytes();
        Ok(SignatureRSV {
            r: H256::from_slice(&bytes[..32]),
            s: H256::from_slice(&bytes[32..64]),
            v: recid.to_byte(),
        })
    }

    /// Secret key bytes (for the key store).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

/// Derive the ledger address of a verifying key.
pub fn address_from_public(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    // skip the 0x04 uncompressed-point tag
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_slice(&hash.as_bytes()[12..])
}

/// Recover the signer address of `signature` over `prehash`.
pub fn recover(prehash: &H256, signature: &SignatureRSV) -> Result<Address, CryptoError> {
    let recid = RecoveryId::try_from(signature.v).map_err(|_| CryptoError::InvalidSignature)?;
    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(signature.r.as_bytes());
    sig_bytes[32..].copy_from_slice(signature.s.as_bytes());
    let sig = Signature::from_slice(&sig_bytes).map_err(|_| CryptoError::InvalidSignature)?;
    let key = VerifyingKey::recover_from_prehash(prehash.as_bytes(), &sig, recid)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(address_from_public(&key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_recover_roundtrip() {
        let keypair = Keypair::generate();
        let message = keccak256(b"lattice unit");

        let signature = keypair.sign(&message).unwrap();
        let recovered = recover(&message, &signature).unwrap();

        assert_eq!(recovered, keypair.address());
    }

    #[test]
    fn test_recovery_id_is_zero_or_one() {
        let keypair = Keypair::from_bytes([0x42u8; 32]).unwrap();
        let signature = keypair.sign(&keccak256(b"v check")).unwrap();
        assert!(signature.v <= 1);
    }

    #[test]
    fn test_wrong_message_recovers_different_address() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(&keccak256(b"message one")).unwrap();
        let recovered = recover(&keccak256(b"message two"), &signature);
        match recovered {
            Ok(address) => assert_ne!(address, keypair.address()),
            Err(_) => {} // an invalid point is also acceptable
        }
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Keypair::from_bytes([0xABu8; 32]).unwrap();
        let message = keccak256(b"deterministic test");

        let sig1 = keypair.sign(&message).unwrap();
        let sig2 = keypair.sign(&message).unwrap();

        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_keypair_bytes_roundtrip() {
        let original = Keypair::generate();
        let restored = Keypair::from_bytes(original.to_bytes()).unwrap();
        assert_eq!(original.address(), restored.address());
    }
}

//! # VRF-Style Election Proof
//!
//! A deterministic proof over the epoch seed. The proof is the signer's
//! RFC 6979 signature envelope over `keccak256(seed)`; determinism makes the
//! proof unique per `(key, seed)` pair, recovery makes it verifiable against
//! the sender address alone, and `keccak256(proof)` is the uniformly
//! distributed output the election sorts on.

use crate::keypair::{recover, Keypair};
use crate::CryptoError;
use shared_types::{keccak256, Address, SignatureRSV, H256};

/// Produce the election proof for `seed`.
pub fn vrf_prove(keypair: &Keypair, seed: &H256) -> Result<Vec<u8>, CryptoError> {
    let digest = keccak256(seed.as_bytes());
    let signature = keypair.sign(&digest)?;
    Ok(signature.to_bytes().to_vec())
}

/// Verify `proof` against `sender` and return the election output.
pub fn vrf_verify(sender: &Address, seed: &H256, proof: &[u8]) -> Result<H256, CryptoError> {
    let signature = SignatureRSV::from_bytes(proof).ok_or(CryptoError::InvalidProof)?;
    let digest = keccak256(seed.as_bytes());
    let recovered = recover(&digest, &signature).map_err(|_| CryptoError::InvalidProof)?;
    if recovered != *sender {
        return Err(CryptoError::InvalidProof);
    }
    Ok(vrf_output(proof))
}

/// The sortable output of a proof.
pub fn vrf_output(proof: &[u8]) -> H256 {
    keccak256(proof)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prove_verify_roundtrip() {
        let keypair = Keypair::generate();
        let seed = keccak256(b"epoch 3 seed");

        let proof = vrf_prove(&keypair, &seed).unwrap();
        let output = vrf_verify(&keypair.address(), &seed, &proof).unwrap();

        assert_eq!(output, vrf_output(&proof));
    }

    #[test]
    fn test_proof_is_deterministic() {
        let keypair = Keypair::from_bytes([0x07u8; 32]).unwrap();
        let seed = keccak256(b"seed");
        assert_eq!(
            vrf_prove(&keypair, &seed).unwrap(),
            vrf_prove(&keypair, &seed).unwrap()
        );
    }

    #[test]
    fn test_wrong_sender_rejected() {
        let keypair = Keypair::generate();
        let other = Keypair::generate();
        let seed = keccak256(b"seed");

        let proof = vrf_prove(&keypair, &seed).unwrap();
        assert_eq!(
            vrf_verify(&other.address(), &seed, &proof),
            Err(CryptoError::InvalidProof)
        );
    }

    #[test]
    fn test_outputs_differ_across_seeds() {
        let keypair = Keypair::from_bytes([0x09u8; 32]).unwrap();
        let p1 = vrf_prove(&keypair, &keccak256(b"seed one")).unwrap();
        let p2 = vrf_prove(&keypair, &keccak256(b"seed two")).unwrap();
        assert_ne!(vrf_output(&p1), vrf_output(&p2));
    }
}

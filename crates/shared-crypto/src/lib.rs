//! # Shared Crypto Crate
//!
//! secp256k1 signing for the ledger.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Public-key recovery: units and approves carry no author field; the
//!   author is recovered from the 65-byte `r ‖ s ‖ v` envelope with
//!   `v ∈ {0, 1}` (no 27-offset)
//! - Secret key material zeroized on drop
//!
//! ## Use Cases
//!
//! - Unit and approve signing by the local witness actor
//! - Author recovery during admission
//! - The VRF-style election proof: a deterministic signature over the epoch
//!   seed whose Keccak-256 is the sortable election output

mod errors;
mod keypair;
mod vrf;

pub use errors::CryptoError;
pub use keypair::{address_from_public, recover, Keypair};
pub use vrf::{vrf_output, vrf_prove, vrf_verify};

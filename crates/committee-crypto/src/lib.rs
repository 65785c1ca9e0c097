//! # Committee Cryptography
//!
//! This crate implements the curve-level primitives a state committee relies on:
//!
//! - a two-to-one Poseidon hash over the BN254 scalar field, used for committee leaves,
//!   Merkle roots and signing roots
//! - BLS public keys (G1) and signatures (G2) over BN254
//! - the fixed-width big-endian point encodings used on the wire, and the Groth16 proof
//!   codec built on top of them
/// BLS keys and signatures
pub(crate) mod bls;
pub use bls::{PublicKey, PublicKeyCache, Signature};

/// Fixed-width big-endian encodings of field elements and curve points
pub mod encoding;

/// Poseidon over the BN254 scalar field
pub mod field_hash;
pub use field_hash::{hash_elements, hash_two};

/// Groth16 proof (de)serialization
pub mod proof;
pub use proof::{decode_proof, encode_proof, PROOF_BYTES};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use thiserror::Error;

/// Convenience result alias
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Error type
pub enum CryptoError {
    /// The input does not have the fixed width of the encoding
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    /// A field element was encoded with a value at or above the modulus
    #[error("field element is not canonically encoded")]
    NonCanonicalField,
    #[error("point is not on the curve")]
    NotOnCurve,
    #[error("point is not in the prime order subgroup")]
    NotInSubgroup,
    /// The point at infinity is never a valid key or signature
    #[error("unexpected point at infinity")]
    PointAtInfinity,
}

//! Groth16 proofs travel as `a || b || c`: two G1 points around one G2 point, each in the
//! fixed-width big-endian point encoding.
use crate::{
    encoding::{
        check_len, g1_from_be_bytes, g1_to_be_bytes, g2_from_be_bytes, g2_to_be_bytes, G1_BYTES,
        G2_BYTES,
    },
    CryptoResult,
};
use ark_bn254::Bn254;
use ark_groth16::Proof;

/// Width of an encoded proof
pub const PROOF_BYTES: usize = 2 * G1_BYTES + G2_BYTES;

pub fn encode_proof(proof: &Proof<Bn254>) -> Vec<u8> {
    let mut out = Vec::with_capacity(PROOF_BYTES);
    out.extend_from_slice(&g1_to_be_bytes(&proof.a));
    out.extend_from_slice(&g2_to_be_bytes(&proof.b));
    out.extend_from_slice(&g1_to_be_bytes(&proof.c));
    out
}

/// Decodes a proof, validating every point. This does not say anything about whether the
/// proof verifies.
pub fn decode_proof(bytes: &[u8]) -> CryptoResult<Proof<Bn254>> {
    check_len(bytes, PROOF_BYTES)?;
    let (a, rest) = bytes.split_at(G1_BYTES);
    let (b, c) = rest.split_at(G2_BYTES);
    Ok(Proof {
        a: g1_from_be_bytes(a)?,
        b: g2_from_be_bytes(b)?,
        c: g1_from_be_bytes(c)?,
    })
}

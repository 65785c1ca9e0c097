//! Points are encoded as their affine coordinates, each coordinate a 32 byte big-endian
//! integer. G2 coordinates are written imaginary part first (`x.c1, x.c0, y.c1, y.c0`), which
//! is the layout the EVM pairing precompile expects. The point at infinity is all zeroes.
use crate::{CryptoError, CryptoResult};
use ark_bn254::{Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::{BigInteger, PrimeField, Zero};

/// Width of a single encoded field element
pub const FIELD_BYTES: usize = 32;
/// Width of an encoded G1 point
pub const G1_BYTES: usize = 2 * FIELD_BYTES;
/// Width of an encoded G2 point
pub const G2_BYTES: usize = 4 * FIELD_BYTES;

const LIMB_BYTES: usize = FIELD_BYTES / 2;

/// Big-endian encoding of any prime field element, left padded to `FIELD_BYTES`
pub fn field_to_be_bytes<F: PrimeField>(element: &F) -> [u8; FIELD_BYTES] {
    let bytes = element.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_BYTES];
    let start = FIELD_BYTES.saturating_sub(bytes.len());
    out[start..].copy_from_slice(&bytes[bytes.len() - (FIELD_BYTES - start)..]);
    out
}

/// Parses a canonical big-endian field element. Values at or above the modulus are rejected
/// instead of being reduced.
pub fn field_from_be_bytes<F: PrimeField>(bytes: &[u8]) -> CryptoResult<F> {
    check_len(bytes, FIELD_BYTES)?;
    let element = F::from_be_bytes_mod_order(bytes);
    if field_to_be_bytes(&element)[..] != *bytes {
        return Err(CryptoError::NonCanonicalField);
    }
    Ok(element)
}

/// Interprets arbitrary bytes as a big-endian integer reduced into the scalar field
pub fn fr_from_be_bytes_mod_order(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// Reduces a base field element into the scalar field through its big-endian encoding
pub fn fq_to_fr(element: &Fq) -> Fr {
    Fr::from_be_bytes_mod_order(&field_to_be_bytes(element))
}

/// Splits a base field element into its high and low 128-bit halves, each lifted into the
/// scalar field. Unlike `fq_to_fr` this is injective.
pub fn fq_limbs(element: &Fq) -> [Fr; 2] {
    let bytes = field_to_be_bytes(element);
    let (hi, lo) = bytes.split_at(LIMB_BYTES);
    [Fr::from_be_bytes_mod_order(hi), Fr::from_be_bytes_mod_order(lo)]
}

pub fn g1_to_be_bytes(point: &G1Affine) -> [u8; G1_BYTES] {
    let mut out = [0u8; G1_BYTES];
    if point.infinity {
        return out;
    }
    out[..FIELD_BYTES].copy_from_slice(&field_to_be_bytes(&point.x));
    out[FIELD_BYTES..].copy_from_slice(&field_to_be_bytes(&point.y));
    out
}

/// Decodes a G1 point and checks that it lies on the curve and in the prime order subgroup
pub fn g1_from_be_bytes(bytes: &[u8]) -> CryptoResult<G1Affine> {
    check_len(bytes, G1_BYTES)?;
    let (x_bytes, y_bytes) = bytes.split_at(FIELD_BYTES);
    let x: Fq = field_from_be_bytes(x_bytes)?;
    let y: Fq = field_from_be_bytes(y_bytes)?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(CryptoError::NotOnCurve);
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CryptoError::NotInSubgroup);
    }
    Ok(point)
}

pub fn g2_to_be_bytes(point: &G2Affine) -> [u8; G2_BYTES] {
    let mut out = [0u8; G2_BYTES];
    if point.infinity {
        return out;
    }
    let coordinates = [point.x.c1, point.x.c0, point.y.c1, point.y.c0];
    for (chunk, coordinate) in out.chunks_exact_mut(FIELD_BYTES).zip(coordinates.iter()) {
        chunk.copy_from_slice(&field_to_be_bytes(coordinate));
    }
    out
}

/// Decodes a G2 point and checks that it lies on the curve and in the prime order subgroup
pub fn g2_from_be_bytes(bytes: &[u8]) -> CryptoResult<G2Affine> {
    check_len(bytes, G2_BYTES)?;
    let mut coordinates = Vec::with_capacity(4);
    for chunk in bytes.chunks_exact(FIELD_BYTES) {
        coordinates.push(field_from_be_bytes::<Fq>(chunk)?);
    }
    if coordinates.iter().all(Zero::is_zero) {
        return Ok(G2Affine::identity());
    }
    let x = Fq2::new(coordinates[1], coordinates[0]);
    let y = Fq2::new(coordinates[3], coordinates[2]);
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(CryptoError::NotOnCurve);
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CryptoError::NotInSubgroup);
    }
    Ok(point)
}

pub(crate) fn check_len(bytes: &[u8], expected: usize) -> CryptoResult<()> {
    if bytes.len() != expected {
        return Err(CryptoError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

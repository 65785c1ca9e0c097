use crate::{
    encoding::{fq_limbs, g2_from_be_bytes, g2_to_be_bytes, G2_BYTES},
    hash_elements, CryptoError, CryptoResult,
};

use ark_bn254::{Fr, G2Affine, G2Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Zero;
use std::fmt;

/// A BLS signature on G2
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(G2Affine);

impl From<G2Projective> for Signature {
    fn from(sig: G2Projective) -> Signature {
        Signature(sig.into_affine())
    }
}

impl AsRef<G2Affine> for Signature {
    fn as_ref(&self) -> &G2Affine {
        &self.0
    }
}

impl Signature {
    /// Decodes a signature, rejecting points off the curve, outside the subgroup and the
    /// point at infinity
    pub fn from_be_bytes(bytes: &[u8]) -> CryptoResult<Signature> {
        let point = g2_from_be_bytes(bytes)?;
        if point.infinity {
            return Err(CryptoError::PointAtInfinity);
        }
        Ok(Signature(point))
    }

    pub fn to_be_bytes(&self) -> [u8; G2_BYTES] {
        g2_to_be_bytes(&self.0)
    }

    /// Sums the signatures
    pub fn aggregate<'a, I: IntoIterator<Item = &'a Signature>>(signatures: I) -> Signature {
        let mut asig = G2Projective::zero();
        for sig in signatures {
            asig += sig.0.into_group();
        }
        asig.into()
    }

    /// Compresses the signature into a single scalar field element: the field hash over the
    /// eight 128-bit limbs of `x.c1, x.c0, y.c1, y.c0`
    pub fn digest(&self) -> Fr {
        let coordinates = [self.0.x.c1, self.0.x.c0, self.0.y.c1, self.0.y.c0];
        let limbs = coordinates
            .iter()
            .flat_map(|coordinate| fq_limbs(coordinate))
            .collect::<Vec<_>>();
        hash_elements(&limbs)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{})", hex::encode(self.to_be_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{keygen_mul, message_point, sign};
    use ark_ec::Group;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn signature_serialization() {
        let rng = &mut XorShiftRng::seed_from_u64(3);
        let (secret_keys, _) = keygen_mul(rng, 3);
        let sig = sign(&message_point(&Fr::from(42u64)), &secret_keys);
        let decoded = Signature::from_be_bytes(&sig.to_be_bytes()).unwrap();
        assert_eq!(decoded, sig);
        assert_eq!(decoded.digest(), sig.digest());
    }

    #[test]
    fn aggregate_matches_joint_signing() {
        let rng = &mut XorShiftRng::seed_from_u64(4);
        let (secret_keys, _) = keygen_mul(rng, 4);
        let message = message_point(&Fr::from(7u64));
        let individual = secret_keys
            .iter()
            .map(|sk| sign(&message, std::slice::from_ref(sk)))
            .collect::<Vec<_>>();
        assert_eq!(Signature::aggregate(&individual), sign(&message, &secret_keys));
    }

    #[test]
    fn digest_depends_on_the_point() {
        let a = Signature::from(G2Projective::generator());
        let b = Signature::from(G2Projective::generator().double());
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn rejects_infinity() {
        assert_eq!(
            Signature::from_be_bytes(&[0u8; G2_BYTES]),
            Err(CryptoError::PointAtInfinity)
        );
    }
}

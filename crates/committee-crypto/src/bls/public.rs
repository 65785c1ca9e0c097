use crate::{
    encoding::{fq_limbs, fq_to_fr, g1_from_be_bytes, g1_to_be_bytes, G1_BYTES},
    CryptoError, CryptoResult,
};

use ark_bn254::{Fr, G1Affine, G1Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Zero;
use std::fmt;

/// A BLS public key on G1
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(G1Affine);

impl From<G1Projective> for PublicKey {
    fn from(pk: G1Projective) -> PublicKey {
        PublicKey(pk.into_affine())
    }
}

impl From<G1Affine> for PublicKey {
    fn from(pk: G1Affine) -> PublicKey {
        PublicKey(pk)
    }
}

impl AsRef<G1Affine> for PublicKey {
    fn as_ref(&self) -> &G1Affine {
        &self.0
    }
}

impl PublicKey {
    /// Decodes a key from its `(Gx, Gy)` big-endian encoding. Besides the curve and subgroup
    /// checks, the point at infinity is rejected since it would verify any signature.
    pub fn from_be_bytes(bytes: &[u8]) -> CryptoResult<PublicKey> {
        let point = g1_from_be_bytes(bytes)?;
        if point.infinity {
            return Err(CryptoError::PointAtInfinity);
        }
        Ok(PublicKey(point))
    }

    pub fn to_be_bytes(&self) -> [u8; G1_BYTES] {
        g1_to_be_bytes(&self.0)
    }

    /// Sums the keys. The aggregate of no keys is the point at infinity.
    pub fn aggregate<'a, I: IntoIterator<Item = &'a PublicKey>>(public_keys: I) -> PublicKey {
        let mut apk = G1Projective::zero();
        for pk in public_keys {
            apk += pk.0.into_group();
        }
        apk.into()
    }

    pub fn is_infinity(&self) -> bool {
        self.0.infinity
    }

    /// Both coordinates reduced into the scalar field, as absorbed by the leaf hash
    pub fn coordinates(&self) -> (Fr, Fr) {
        (fq_to_fr(&self.0.x), fq_to_fr(&self.0.y))
    }

    /// The coordinates split into 128-bit limbs: `[x_hi, x_lo, y_hi, y_lo]`
    pub fn limbs(&self) -> [Fr; 4] {
        let [x_hi, x_lo] = fq_limbs(&self.0.x);
        let [y_hi, y_lo] = fq_limbs(&self.0.y);
        [x_hi, x_lo, y_hi, y_lo]
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(0x{})", hex::encode(self.to_be_bytes()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::keygen_mul;
    use ark_bn254::Fq;
    use ark_ec::Group;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn test_public_key_serialization() {
        let rng = &mut XorShiftRng::seed_from_u64(1);
        let (_, keys) = keygen_mul(rng, 10);
        for key in keys {
            let bytes = key.to_be_bytes();
            assert_eq!(PublicKey::from_be_bytes(&bytes).unwrap(), key);
        }
    }

    #[test]
    fn rejects_infinity() {
        assert_eq!(
            PublicKey::from_be_bytes(&[0u8; G1_BYTES]),
            Err(CryptoError::PointAtInfinity)
        );
    }

    #[test]
    fn aggregation() {
        let rng = &mut XorShiftRng::seed_from_u64(2);
        let (secret_keys, keys) = keygen_mul(rng, 5);
        let sum: Fr = secret_keys.iter().sum();
        let expected = PublicKey::from(G1Projective::generator() * sum);
        assert_eq!(PublicKey::aggregate(&keys), expected);
        assert!(PublicKey::aggregate(&Vec::<PublicKey>::new()).is_infinity());
    }

    #[test]
    fn limbs_recompose_coordinates() {
        let key = PublicKey::from(G1Projective::generator());
        // the generator is (1, 2)
        assert_eq!(
            key.limbs(),
            [Fr::zero(), Fr::from(1u64), Fr::zero(), Fr::from(2u64)]
        );
        assert_eq!(key.coordinates(), (Fr::from(1u64), Fr::from(2u64)));
        assert_eq!(key.as_ref().x, Fq::from(1u64));
    }
}

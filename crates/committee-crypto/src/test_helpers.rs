//! Key generation and signing helpers shared by the tests of this crate and its dependents.
//! Signing takes an already hashed message point: hashing to G2 is the signer's business.
use crate::{PublicKey, Signature};

use ark_bn254::{Fr, G1Projective, G2Projective};
use ark_ec::Group;
use ark_ff::{UniformRand, Zero};
use rand::Rng;

/// generate a keypair
pub fn keygen<R: Rng>(rng: &mut R) -> (Fr, PublicKey) {
    let secret_key = Fr::rand(rng);
    let pubkey = PublicKey::from(G1Projective::generator() * secret_key);
    (secret_key, pubkey)
}

/// generate N keypairs
pub fn keygen_mul<R: Rng>(rng: &mut R, num: usize) -> (Vec<Fr>, Vec<PublicKey>) {
    (0..num).map(|_| keygen(rng)).unzip()
}

/// A stand-in for hash-to-curve: the message point for a field element `m` is `m * G2`
pub fn message_point(message: &Fr) -> G2Projective {
    G2Projective::generator() * message
}

/// signs a message point with a vector of secret keys and returns the aggregate signature
pub fn sign(message: &G2Projective, secret_keys: &[Fr]) -> Signature {
    let asig = secret_keys
        .iter()
        .fold(G2Projective::zero(), |acc, sk| acc + *message * sk);
    Signature::from(asig)
}

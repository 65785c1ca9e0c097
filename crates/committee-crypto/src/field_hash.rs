//! The field hash every committee structure is built on: a Poseidon sponge over the BN254
//! scalar field with width 3 (rate 2, capacity 1), the x^5 S-box, 8 full and 57 partial
//! rounds. Round constants and the MDS matrix are derived with the Grain LFSR, so they never
//! need to be shipped alongside the code.
//!
//! Changing any of these parameters changes every root and leaf produced by the crate.
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use ark_ff::PrimeField;
use log::trace;
use once_cell::sync::Lazy;

const FULL_ROUNDS: usize = 8;
const PARTIAL_ROUNDS: usize = 57;
const ALPHA: u64 = 5;
const RATE: usize = 2;
const CAPACITY: usize = 1;

/// Lazily derived Poseidon parameters
pub static POSEIDON_CONFIG: Lazy<PoseidonConfig<Fr>> = Lazy::new(|| {
    trace!("deriving poseidon round constants");
    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        u64::from(Fr::MODULUS_BIT_SIZE),
        RATE,
        FULL_ROUNDS as u64,
        PARTIAL_ROUNDS as u64,
        0,
    );
    PoseidonConfig::new(FULL_ROUNDS, PARTIAL_ROUNDS, ALPHA, mds, ark, RATE, CAPACITY)
});

/// Hashes two field elements into one. The order of the arguments matters.
pub fn hash_two(left: &Fr, right: &Fr) -> Fr {
    hash_elements(&[*left, *right])
}

/// Absorbs the elements in order and squeezes a single element
pub fn hash_elements(elements: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(&POSEIDON_CONFIG);
    for element in elements {
        sponge.absorb(element);
    }
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

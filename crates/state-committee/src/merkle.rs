//! The committee root is the root of a complete binary tree over the leaves in their
//! committee order. The leaf layer is padded with zeroes up to the next power of two (at
//! least one leaf), and layer `k + 1` is built by hashing elements `2i` and `2i + 1` of layer
//! `k`. Both the padding value and the pairing order are part of the root's definition:
//! circuits and other implementations recompute it bit for bit.
use ark_bn254::Fr;
use ark_ff::Zero;
use committee_crypto::hash_two;

/// The padding leaf, which is also the root of an empty committee
pub fn zero_hash() -> Fr {
    Fr::zero()
}

/// Width of the padded leaf layer for `leaf_count` leaves
pub fn padded_width(leaf_count: usize) -> usize {
    leaf_count.next_power_of_two()
}

/// Computes the root over `leaves`. Costs `padded_width(leaves.len()) - 1` hashes.
pub fn compute_root(leaves: &[Fr]) -> Fr {
    let mut layer = Vec::with_capacity(padded_width(leaves.len()));
    layer.extend_from_slice(leaves);
    layer.resize(padded_width(leaves.len()), zero_hash());
    while layer.len() > 1 {
        layer = layer
            .chunks_exact(2)
            .map(|pair| hash_two(&pair[0], &pair[1]))
            .collect();
    }
    layer.first().copied().unwrap_or_else(zero_hash)
}

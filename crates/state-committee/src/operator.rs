use crate::BlockNumber;
use ark_bn254::Fr;
use ark_ff::PrimeField;
use committee_crypto::{hash_two, PublicKey};
use std::fmt;

/// Width of an operator identity
pub const IDENTITY_BYTES: usize = 20;

/// An address-like operator identity, unique across the registry
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorId(pub [u8; IDENTITY_BYTES]);

impl OperatorId {
    /// The identity read as a big-endian integer. 160 bits always fit the scalar field, so
    /// distinct identities map to distinct elements.
    pub fn to_field(&self) -> Fr {
        Fr::from_be_bytes_mod_order(&self.0)
    }
}

impl From<[u8; IDENTITY_BYTES]> for OperatorId {
    fn from(bytes: [u8; IDENTITY_BYTES]) -> Self {
        OperatorId(bytes)
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A registered operator. Operators are never deleted; once `expiry_block` passes they can no
/// longer subscribe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operator {
    pub identity: OperatorId,
    pub public_key: PublicKey,
    pub stake: u64,
    pub expiry_block: BlockNumber,
}

impl Operator {
    pub fn new(identity: OperatorId, public_key: PublicKey, expiry_block: BlockNumber) -> Self {
        Self {
            identity,
            public_key,
            stake: 0,
            expiry_block,
        }
    }

    pub fn is_expired(&self, current_block: BlockNumber) -> bool {
        self.expiry_block <= current_block
    }

    /// The committee leaf for this operator's present record
    pub fn leaf_hash(&self) -> Fr {
        leaf_hash(&self.public_key, &self.identity, self.stake)
    }
}

/// `H(H(pk.x, pk.y), H(identity, stake))`, with the key coordinates reduced into the scalar
/// field
pub fn leaf_hash(public_key: &PublicKey, identity: &OperatorId, stake: u64) -> Fr {
    let (x, y) = public_key.coordinates();
    hash_two(
        &hash_two(&x, &y),
        &hash_two(&identity.to_field(), &Fr::from(stake)),
    )
}

//! BLS keys and signatures over BN254, with public keys on G1 and signatures on G2.
//! Signature verification itself happens inside the committee circuits, so this module only
//! deals with validity, encoding and aggregation.
mod public;
pub use public::PublicKey;

mod signature;
pub use signature::Signature;

mod cache;
pub use cache::PublicKeyCache;

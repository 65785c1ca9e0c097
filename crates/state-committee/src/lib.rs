//! # State Committees
//!
//! This crate tracks, per external chain, the operators authorized to attest to that chain's
//! state, and verifies evidence claiming that a chain state was attested by the committee.
//!
//! The moving parts are summarized below:
//!
//! - the [`OperatorRegistry`] stores operator identities, BLS keys, stake and expiry
//! - the [`CommitteeAccumulator`] keeps, per chain, the ordered sequence of subscribed operator
//!   leaves and a Poseidon Merkle root over them. Subscriptions mutate the "next" root; at every
//!   epoch boundary [`CommitteeAccumulator::rotate`] promotes it to "current"
//! - the [`EpochScheduler`] maps block numbers to epochs for each chain
//! - the [`EvidenceVerifier`] checks an [`Evidence`] record against the committee roots in force
//!   at its epoch and routes its Groth16 proof to the circuit of the stated committee size
//!
//! All state lives behind a [`CommitteeStore`], so the same logic runs on the in-memory
//! [`MemoryStore`] used in tests and on a durable key-value store.
//!
//! Root recomputation is `O(n)` hashes in the padded leaf count and happens on every
//! subscription change, so committees in the thousands make every subscribe and unsubscribe
//! proportionally more expensive.

mod accumulator;
pub use accumulator::CommitteeAccumulator;

mod committee;
pub use committee::{ChainCommittee, CommitteeLeaf, CommitteePair, CommitteeRoot};

mod config;
pub use config::CommitteeConfig;

mod epoch;
pub use epoch::{EpochSchedule, EpochScheduler};

mod error;
pub use error::{CommitteeError, EvidenceError, RootField, VerificationStage};

/// Merkle root computation over committee leaves
pub mod merkle;

mod operator;
pub use operator::{leaf_hash, Operator, OperatorId, IDENTITY_BYTES};

mod registry;
pub use registry::OperatorRegistry;

mod service;
pub use service::StateCommittee;

mod store;
pub use store::{CommitteeStore, MemoryStore, StoreError};

/// Evidence verification and proof-circuit routing
pub mod verifier;
pub use verifier::{
    AggregateBucket, CircuitVerifier, Evidence, EvidenceVerifier, Groth16Verifier, VerifierRoutes,
};

/// External chain identifier
pub type ChainId = u32;
/// Block height on the external chain
pub type BlockNumber = u64;
/// Epoch index, see [`EpochSchedule::epoch_index`]
pub type EpochIndex = u64;

use crate::{
    store::StoreError, verifier::AggregateBucket, BlockNumber, ChainId, EpochIndex, OperatorId,
};
use ark_relations::r1cs::SynthesisError;
use committee_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors raised by the registry, the scheduler and the accumulator. Every one of them is
/// raised before any state is written.
pub enum CommitteeError {
    #[error("chain {0} is not registered")]
    ChainNotRegistered(ChainId),
    #[error("chain {0} is already registered")]
    ChainAlreadyRegistered(ChainId),
    #[error("invalid parameters for chain {chain_id}: epoch length must be positive")]
    InvalidChainParams { chain_id: ChainId },
    #[error("operator {0} is already registered")]
    DuplicateOperator(OperatorId),
    #[error("operator {0} is not registered")]
    UnknownOperator(OperatorId),
    #[error("invalid BLS public key: {0}")]
    InvalidPublicKey(#[source] CryptoError),
    #[error("operator {operator} expired at block {expiry_block} (current block {current_block})")]
    OperatorExpired {
        operator: OperatorId,
        expiry_block: BlockNumber,
        current_block: BlockNumber,
    },
    #[error("operator {operator} is already subscribed to chain {chain_id}")]
    AlreadySubscribed {
        chain_id: ChainId,
        operator: OperatorId,
    },
    #[error("operator {operator} is not subscribed to chain {chain_id}")]
    NotSubscribed {
        chain_id: ChainId,
        operator: OperatorId,
    },
    /// The block precedes the chain's first epoch, precedes the last rotation, or belongs to an
    /// epoch the committee has not been rotated into yet
    #[error("epoch of block {block_number} is not ready on chain {chain_id}")]
    EpochNotReady {
        chain_id: ChainId,
        block_number: BlockNumber,
    },
    /// The epoch was pruned from the committee history
    #[error("epoch {epoch} of chain {chain_id} is no longer retained")]
    EpochUnavailable { chain_id: ChainId, epoch: EpochIndex },
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// The roots and hashes an evidence record is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootField {
    BlockHash,
    CurrentRoot,
    NextRoot,
}

/// Where in `Received → RootsChecked → ProofRouted → SignatureChecked` a verification stopped.
///
/// A rejection reports the last stage the evidence completed, not the step that rejected it:
/// a root mismatch is raised while checking roots and reports `Received`, an unrouted size is
/// raised while routing and reports `RootsChecked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerificationStage {
    Received,
    RootsChecked,
    ProofRouted,
    SignatureChecked,
}

#[derive(Debug, Error)]
/// Error raised while verifying an evidence record
pub enum EvidenceError {
    #[error("committee error: {0}")]
    Committee(#[from] CommitteeError),
    #[error("{0:?} does not match")]
    RootMismatch(RootField),
    #[error("public key is not the one registered for operator {0}")]
    OperatorKeyMismatch(OperatorId),
    #[error("no verifier is routed for aggregate size {0}")]
    UnknownAggregateSize(u32),
    #[error("a verifier is already routed for {0:?}")]
    DuplicateRoute(AggregateBucket),
    #[error("malformed proof: {0}")]
    MalformedProof(#[source] CryptoError),
    #[error("malformed signature: {0}")]
    MalformedSignature(#[source] CryptoError),
    #[error("malformed public key: {0}")]
    MalformedPublicKey(#[source] CryptoError),
    #[error("circuit expects {expected} public inputs, got {actual}")]
    PublicInputArity { expected: usize, actual: usize },
    #[error("committee of {members} members exceeds the {bucket:?} circuit")]
    CommitteeTooLarge {
        bucket: AggregateBucket,
        members: u32,
    },
    #[error("Synthesis Error: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("proof verification failed")]
    ProofVerificationFailed,
}

impl EvidenceError {
    /// The stage the evidence had reached when it was rejected
    pub fn stage(&self) -> VerificationStage {
        match self {
            EvidenceError::Committee(_) | EvidenceError::RootMismatch(_) => {
                VerificationStage::Received
            }
            EvidenceError::OperatorKeyMismatch(_)
            | EvidenceError::UnknownAggregateSize(_)
            | EvidenceError::DuplicateRoute(_) => VerificationStage::RootsChecked,
            EvidenceError::MalformedProof(_)
            | EvidenceError::MalformedSignature(_)
            | EvidenceError::MalformedPublicKey(_)
            | EvidenceError::PublicInputArity { .. }
            | EvidenceError::CommitteeTooLarge { .. } => VerificationStage::ProofRouted,
            EvidenceError::Synthesis(_) | EvidenceError::ProofVerificationFailed => {
                VerificationStage::SignatureChecked
            }
        }
    }

    /// True when the evidence was rejected for its shape (undecodable points, unregistered
    /// chain, unrouted size) rather than for its content
    pub fn is_malformed(&self) -> bool {
        match self {
            EvidenceError::Committee(_)
            | EvidenceError::UnknownAggregateSize(_)
            | EvidenceError::DuplicateRoute(_)
            | EvidenceError::MalformedProof(_)
            | EvidenceError::MalformedSignature(_)
            | EvidenceError::MalformedPublicKey(_)
            | EvidenceError::PublicInputArity { .. }
            | EvidenceError::CommitteeTooLarge { .. }
            | EvidenceError::Synthesis(_) => true,
            EvidenceError::RootMismatch(_)
            | EvidenceError::OperatorKeyMismatch(_)
            | EvidenceError::ProofVerificationFailed => false,
        }
    }

    /// True only when the proof was well formed and the pairing check said no
    pub fn is_proof_failure(&self) -> bool {
        matches!(self, EvidenceError::ProofVerificationFailed)
    }
}

mod route;
pub use route::{AggregateBucket, CircuitVerifier, Groth16Verifier, VerifierRoutes};

use crate::{
    BlockNumber, ChainId, CommitteeConfig, CommitteeError, CommitteePair, CommitteeStore,
    EvidenceError, OperatorId, RootField, VerificationStage,
};
use ark_bn254::Fr;
use committee_crypto::{
    decode_proof, encoding::fr_from_be_bytes_mod_order, hash_elements, CryptoError, PublicKey,
    Signature,
};
use std::{convert::TryFrom, sync::Arc};
use tracing::{debug, info, span, warn, Level};

/// Width of a block hash
pub const BLOCK_HASH_BYTES: usize = 32;

/// Number of public inputs every committee circuit is built with
pub const NUM_PUBLIC_INPUTS: usize = 8;

/// A claim that a chain state was attested by the committee. Signatures and proofs are kept
/// in their wire encodings and decoded during verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evidence {
    pub operator: OperatorId,
    pub chain_id: ChainId,
    pub claimed_block_hash: [u8; BLOCK_HASH_BYTES],
    pub canonical_block_hash: [u8; BLOCK_HASH_BYTES],
    pub claimed_current_root: Fr,
    pub canonical_current_root: Fr,
    pub claimed_next_root: Fr,
    pub canonical_next_root: Fr,
    pub block_number: BlockNumber,
    /// A block of the epoch whose committee attested the state
    pub epoch_block_number: BlockNumber,
    /// 128 byte G2 signature of the single signer
    pub block_signature: Vec<u8>,
    /// 128 byte aggregate G2 signature of the committee
    pub commit_signature: Vec<u8>,
    /// 256 byte Groth16 proof for the single signer circuit
    pub sig_proof: Vec<u8>,
    /// 256 byte Groth16 proof for an aggregate circuit
    pub agg_proof: Vec<u8>,
}

impl Evidence {
    /// `H(header, current_root, next_root)` over the claimed values
    pub fn signing_root(&self) -> Fr {
        signing_root(
            &self.claimed_block_hash,
            &self.claimed_current_root,
            &self.claimed_next_root,
        )
    }
}

/// The message operators sign: the field hash of the block hash (read big-endian modulo the
/// field order) and the two committee roots
pub fn signing_root(block_hash: &[u8; BLOCK_HASH_BYTES], current_root: &Fr, next_root: &Fr) -> Fr {
    hash_elements(&[
        fr_from_be_bytes_mod_order(block_hash),
        *current_root,
        *next_root,
    ])
}

/// Builds the circuit's public inputs. The order is fixed: `signing_root`, `block_number`,
/// `chain_id`, the signature digest, then the key limbs `x_hi, x_lo, y_hi, y_lo`
pub fn public_inputs(
    evidence: &Evidence,
    signature: &Signature,
    public_key: &PublicKey,
) -> Vec<Fr> {
    let mut inputs = Vec::with_capacity(NUM_PUBLIC_INPUTS);
    inputs.push(evidence.signing_root());
    inputs.push(Fr::from(evidence.block_number));
    inputs.push(Fr::from(evidence.chain_id));
    inputs.push(signature.digest());
    inputs.extend_from_slice(&public_key.limbs());
    inputs
}

/// Checks evidence against the committee roots and routes its proof to the circuit of the
/// stated committee size
pub struct EvidenceVerifier<S> {
    store: Arc<S>,
    routes: VerifierRoutes,
    config: CommitteeConfig,
}

impl<S: CommitteeStore> EvidenceVerifier<S> {
    pub fn new(store: Arc<S>, routes: VerifierRoutes, config: CommitteeConfig) -> Self {
        Self {
            store,
            routes,
            config,
        }
    }

    pub fn routes(&self) -> &VerifierRoutes {
        &self.routes
    }

    /// Compares the claimed block hash and roots with their canonical values and with the
    /// committee pair in force at `epoch_block_number`. Returns that pair.
    pub fn check_roots(&self, evidence: &Evidence) -> Result<CommitteePair, EvidenceError> {
        if evidence.claimed_block_hash != evidence.canonical_block_hash {
            return Err(EvidenceError::RootMismatch(RootField::BlockHash));
        }
        let pair = self
            .store
            .committee(evidence.chain_id)
            .map_err(CommitteeError::from)?
            .ok_or(CommitteeError::ChainNotRegistered(evidence.chain_id))?
            .committee_at(evidence.epoch_block_number)?;
        let (current, next) = pair.roots();
        if evidence.claimed_current_root != evidence.canonical_current_root
            || evidence.claimed_current_root != current
        {
            return Err(EvidenceError::RootMismatch(RootField::CurrentRoot));
        }
        if evidence.claimed_next_root != evidence.canonical_next_root
            || evidence.claimed_next_root != next
        {
            return Err(EvidenceError::RootMismatch(RootField::NextRoot));
        }
        Ok(pair)
    }

    /// Verifies the single signer proof `sig_proof` over `block_signature` by `public_key`,
    /// which must be the key registered for `evidence.operator`
    pub fn verify_single_signature(
        &self,
        evidence: &Evidence,
        public_key: &PublicKey,
    ) -> Result<(), EvidenceError> {
        let span = span!(Level::TRACE, "verify_single_signature", chain_id = evidence.chain_id);
        let _enter = span.enter();

        let result = self.check_roots(evidence).and_then(|_| {
            self.check_signer(evidence, public_key)?;
            let verifier = self.route(AggregateBucket::Single)?;
            self.verify_routed(
                verifier,
                evidence,
                &evidence.sig_proof,
                &evidence.block_signature,
                public_key,
            )
        });
        log_outcome(evidence, &result);
        result
    }

    /// Verifies the aggregate proof `agg_proof` over `commit_signature` by the aggregate key
    /// of the current committee, using the circuit routed for `committee_size`
    pub fn verify_aggregate_signature(
        &self,
        evidence: &Evidence,
        committee_size: u32,
    ) -> Result<(), EvidenceError> {
        let span = span!(
            Level::TRACE,
            "verify_aggregate_signature",
            chain_id = evidence.chain_id,
            committee_size
        );
        let _enter = span.enter();

        let result = self.check_roots(evidence).and_then(|pair| {
            let bucket = AggregateBucket::try_from(committee_size)?;
            if !bucket.is_aggregate() {
                return Err(EvidenceError::UnknownAggregateSize(committee_size));
            }
            let verifier = self.route(bucket)?;
            let committee = pair.current;
            if self.config.enforce_bucket_capacity && committee.leaf_count > bucket.size() {
                return Err(EvidenceError::CommitteeTooLarge {
                    bucket,
                    members: committee.leaf_count,
                });
            }
            if committee.aggregate_key.is_infinity() {
                return Err(EvidenceError::MalformedPublicKey(CryptoError::PointAtInfinity));
            }
            self.verify_routed(
                verifier,
                evidence,
                &evidence.agg_proof,
                &evidence.commit_signature,
                &committee.aggregate_key,
            )
        });
        log_outcome(evidence, &result);
        result
    }

    /// The operator named by the evidence must be registered under `public_key`. Membership
    /// is not required, the operator may have left the committee since the evidence's epoch.
    fn check_signer(
        &self,
        evidence: &Evidence,
        public_key: &PublicKey,
    ) -> Result<(), EvidenceError> {
        let operator = self
            .store
            .operator(&evidence.operator)
            .map_err(CommitteeError::from)?
            .ok_or(CommitteeError::UnknownOperator(evidence.operator))?;
        if operator.public_key != *public_key {
            return Err(EvidenceError::OperatorKeyMismatch(evidence.operator));
        }
        Ok(())
    }

    fn route(&self, bucket: AggregateBucket) -> Result<&dyn CircuitVerifier, EvidenceError> {
        debug!(stage = ?VerificationStage::RootsChecked, ?bucket, "routing proof");
        self.routes.route(bucket)
    }

    fn verify_routed(
        &self,
        verifier: &dyn CircuitVerifier,
        evidence: &Evidence,
        proof: &[u8],
        signature: &[u8],
        public_key: &PublicKey,
    ) -> Result<(), EvidenceError> {
        let proof = decode_proof(proof).map_err(EvidenceError::MalformedProof)?;
        let signature =
            Signature::from_be_bytes(signature).map_err(EvidenceError::MalformedSignature)?;
        let inputs = public_inputs(evidence, &signature, public_key);
        if inputs.len() != verifier.num_public_inputs() {
            return Err(EvidenceError::PublicInputArity {
                expected: verifier.num_public_inputs(),
                actual: inputs.len(),
            });
        }

        debug!(stage = ?VerificationStage::ProofRouted, "checking proof");
        if verifier.verify(&proof, &inputs)? {
            Ok(())
        } else {
            Err(EvidenceError::ProofVerificationFailed)
        }
    }
}

fn log_outcome(evidence: &Evidence, result: &Result<(), EvidenceError>) {
    match result {
        Ok(()) => info!(
            operator = %evidence.operator,
            block_number = evidence.block_number,
            "evidence accepted"
        ),
        Err(e) => warn!(
            operator = %evidence.operator,
            stage = ?e.stage(),
            malformed = e.is_malformed(),
            "evidence rejected: {}",
            e
        ),
    }
}

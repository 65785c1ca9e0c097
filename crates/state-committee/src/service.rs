use crate::{
    BlockNumber, ChainId, CommitteeAccumulator, CommitteeConfig, CommitteeError, CommitteePair,
    CommitteeRoot, CommitteeStore, EpochScheduler, Evidence, EvidenceError, EvidenceVerifier,
    Operator, OperatorId, OperatorRegistry, VerifierRoutes,
};
use ark_bn254::Fr;
use committee_crypto::PublicKey;
use std::sync::Arc;

/// The state committee service: every component wired to one store
pub struct StateCommittee<S> {
    registry: OperatorRegistry<S>,
    accumulator: CommitteeAccumulator<S>,
    scheduler: EpochScheduler<S>,
    verifier: EvidenceVerifier<S>,
}

impl<S: CommitteeStore> StateCommittee<S> {
    pub fn new(store: Arc<S>, config: CommitteeConfig, routes: VerifierRoutes) -> Self {
        Self {
            registry: OperatorRegistry::new(store.clone()),
            accumulator: CommitteeAccumulator::new(store.clone(), config.clone()),
            scheduler: EpochScheduler::new(store.clone()),
            verifier: EvidenceVerifier::new(store, routes, config),
        }
    }

    pub fn registry(&self) -> &OperatorRegistry<S> {
        &self.registry
    }

    pub fn accumulator(&self) -> &CommitteeAccumulator<S> {
        &self.accumulator
    }

    pub fn scheduler(&self) -> &EpochScheduler<S> {
        &self.scheduler
    }

    pub fn verifier(&self) -> &EvidenceVerifier<S> {
        &self.verifier
    }

    pub fn add_operator(
        &self,
        identity: OperatorId,
        public_key: &[u8],
        expiry_block: BlockNumber,
    ) -> Result<Operator, CommitteeError> {
        self.registry.add_operator(identity, public_key, expiry_block)
    }

    pub fn set_stake(&self, identity: &OperatorId, stake: u64) -> Result<(), CommitteeError> {
        self.registry.set_stake(identity, stake)
    }

    pub fn register_chain(
        &self,
        chain_id: ChainId,
        epoch_length: u64,
        epoch_offset: BlockNumber,
    ) -> Result<(), CommitteeError> {
        self.accumulator
            .register_chain(chain_id, epoch_length, epoch_offset)
    }

    pub fn subscribe(
        &self,
        chain_id: ChainId,
        identity: &OperatorId,
        current_block: BlockNumber,
    ) -> Result<CommitteeRoot, CommitteeError> {
        self.accumulator.subscribe(chain_id, identity, current_block)
    }

    pub fn unsubscribe(
        &self,
        chain_id: ChainId,
        identity: &OperatorId,
    ) -> Result<CommitteeRoot, CommitteeError> {
        self.accumulator.unsubscribe(chain_id, identity)
    }

    pub fn refresh_leaf(
        &self,
        chain_id: ChainId,
        identity: &OperatorId,
    ) -> Result<CommitteeRoot, CommitteeError> {
        self.accumulator.refresh_leaf(chain_id, identity)
    }

    pub fn rotate(
        &self,
        chain_id: ChainId,
        block_number: BlockNumber,
    ) -> Result<bool, CommitteeError> {
        self.accumulator.rotate(chain_id, block_number)
    }

    /// `(current_root, next_root)` in force at `block_number`
    pub fn get_committee(
        &self,
        chain_id: ChainId,
        block_number: BlockNumber,
    ) -> Result<(Fr, Fr), CommitteeError> {
        self.committee_pair(chain_id, block_number)
            .map(|pair| pair.roots())
    }

    /// The full snapshots in force at `block_number`
    pub fn committee_pair(
        &self,
        chain_id: ChainId,
        block_number: BlockNumber,
    ) -> Result<CommitteePair, CommitteeError> {
        self.accumulator.get_committee(chain_id, block_number)
    }

    pub fn is_updatable(
        &self,
        chain_id: ChainId,
        block_number: BlockNumber,
    ) -> Result<bool, CommitteeError> {
        self.scheduler.is_updatable(chain_id, block_number)
    }

    pub fn verify_single_signature(
        &self,
        evidence: &Evidence,
        public_key: &PublicKey,
    ) -> Result<(), EvidenceError> {
        self.verifier.verify_single_signature(evidence, public_key)
    }

    pub fn verify_aggregate_signature(
        &self,
        evidence: &Evidence,
        committee_size: u32,
    ) -> Result<(), EvidenceError> {
        self.verifier
            .verify_aggregate_signature(evidence, committee_size)
    }
}

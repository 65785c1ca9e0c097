use crate::{BlockNumber, ChainId, CommitteeError, CommitteeStore, Operator, OperatorId};
use committee_crypto::PublicKeyCache;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Stores operator identities, keys, stake and expiry.
///
/// Registry writes are serialized by the key cache lock, so the uniqueness check and the
/// insert of `add_operator` cannot interleave.
pub struct OperatorRegistry<S> {
    store: Arc<S>,
    keys: Mutex<PublicKeyCache>,
}

impl<S: CommitteeStore> OperatorRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            keys: Mutex::new(PublicKeyCache::new()),
        }
    }

    /// Registers an operator with zero stake. `public_key` is the 64 byte big-endian encoding
    /// of its BLS key, which must be a valid non-identity point of the prime order subgroup.
    pub fn add_operator(
        &self,
        identity: OperatorId,
        public_key: &[u8],
        expiry_block: BlockNumber,
    ) -> Result<Operator, CommitteeError> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if self.store.operator(&identity)?.is_some() {
            return Err(CommitteeError::DuplicateOperator(identity));
        }
        let public_key = keys
            .deserialize(public_key)
            .map_err(CommitteeError::InvalidPublicKey)?;
        let operator = Operator::new(identity, public_key, expiry_block);
        self.store.put_operator(operator.clone())?;
        info!(operator = %identity, expiry_block, "registered operator");
        Ok(operator)
    }

    /// Updates an operator's stake. Leaves already in a committee keep the stake they were
    /// computed with until the operator is refreshed or subscribes again.
    pub fn set_stake(&self, identity: &OperatorId, stake: u64) -> Result<(), CommitteeError> {
        let _guard = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        let mut operator = self.operator(identity)?;
        operator.stake = stake;
        self.store.put_operator(operator)?;
        debug!(operator = %identity, stake, "updated stake");
        Ok(())
    }

    pub fn operator(&self, identity: &OperatorId) -> Result<Operator, CommitteeError> {
        self.store
            .operator(identity)?
            .ok_or(CommitteeError::UnknownOperator(*identity))
    }

    /// Chains the operator is currently subscribed to, in ascending order
    pub fn subscribed_chains(&self, identity: &OperatorId) -> Result<Vec<ChainId>, CommitteeError> {
        self.operator(identity)?;
        let mut chains = Vec::new();
        for chain_id in self.store.chain_ids()? {
            if let Some(committee) = self.store.committee(chain_id)? {
                if committee.is_subscribed(identity) {
                    chains.push(chain_id);
                }
            }
        }
        Ok(chains)
    }
}

use crate::{ChainCommittee, ChainId, Operator, OperatorId};
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        StoreError::Poisoned("store")
    }
}

/// Keyed persistence for operator records and chain committees.
///
/// Reads return owned snapshots. Writers replace whole records, so a reader observes either
/// the record before a mutation or after it, never a partial update.
pub trait CommitteeStore: Send + Sync {
    fn operator(&self, identity: &OperatorId) -> Result<Option<Operator>, StoreError>;

    fn put_operator(&self, operator: Operator) -> Result<(), StoreError>;

    fn committee(&self, chain_id: ChainId) -> Result<Option<ChainCommittee>, StoreError>;

    fn put_committee(&self, committee: ChainCommittee) -> Result<(), StoreError>;

    fn chain_ids(&self) -> Result<Vec<ChainId>, StoreError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    operators: RwLock<HashMap<OperatorId, Operator>>,
    committees: RwLock<HashMap<ChainId, ChainCommittee>>,
}

impl CommitteeStore for MemoryStore {
    fn operator(&self, identity: &OperatorId) -> Result<Option<Operator>, StoreError> {
        Ok(self.operators.read()?.get(identity).cloned())
    }

    fn put_operator(&self, operator: Operator) -> Result<(), StoreError> {
        self.operators.write()?.insert(operator.identity, operator);
        Ok(())
    }

    fn committee(&self, chain_id: ChainId) -> Result<Option<ChainCommittee>, StoreError> {
        Ok(self.committees.read()?.get(&chain_id).cloned())
    }

    fn put_committee(&self, committee: ChainCommittee) -> Result<(), StoreError> {
        self.committees
            .write()?
            .insert(committee.chain_id(), committee);
        Ok(())
    }

    fn chain_ids(&self) -> Result<Vec<ChainId>, StoreError> {
        let mut ids = self.committees.read()?.keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        Ok(ids)
    }
}

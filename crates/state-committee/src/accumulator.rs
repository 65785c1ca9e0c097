use crate::{
    BlockNumber, ChainCommittee, ChainId, CommitteeConfig, CommitteeError, CommitteePair,
    CommitteeRoot, CommitteeStore, EpochSchedule, OperatorId,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{debug, info, span, warn, Level};

/// Maintains the committee of every registered chain.
///
/// Mutations of one chain are serialized by that chain's lock and applied to a copy of the
/// stored committee, which replaces the stored one only once the new roots are computed.
/// Readers never take the chain lock: they load a snapshot and see the `(current, next)`
/// pair of either the previous or the new state.
pub struct CommitteeAccumulator<S> {
    store: Arc<S>,
    config: CommitteeConfig,
    locks: Mutex<HashMap<ChainId, Arc<Mutex<()>>>>,
}

impl<S: CommitteeStore> CommitteeAccumulator<S> {
    pub fn new(store: Arc<S>, config: CommitteeConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CommitteeConfig {
        &self.config
    }

    /// Chains are never removed, so the table only grows with registered chains
    fn chain_lock(&self, chain_id: ChainId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(chain_id)
            .or_default()
            .clone()
    }

    /// Runs `mutate` on a copy of the chain's committee under the chain lock and stores the
    /// copy if it succeeds
    fn update<T>(
        &self,
        chain_id: ChainId,
        mutate: impl FnOnce(&mut ChainCommittee) -> Result<T, CommitteeError>,
    ) -> Result<T, CommitteeError> {
        self.committee(chain_id)?;
        let lock = self.chain_lock(chain_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut committee = self.committee(chain_id)?;
        let result = mutate(&mut committee)?;
        self.store.put_committee(committee)?;
        Ok(result)
    }

    /// A snapshot of the chain's committee
    pub fn committee(&self, chain_id: ChainId) -> Result<ChainCommittee, CommitteeError> {
        self.store
            .committee(chain_id)?
            .ok_or(CommitteeError::ChainNotRegistered(chain_id))
    }

    /// Initializes a chain with an empty committee. Both roots start as the empty root and
    /// the chain has no epoch in force until its first rotation.
    pub fn register_chain(
        &self,
        chain_id: ChainId,
        epoch_length: u64,
        epoch_offset: BlockNumber,
    ) -> Result<(), CommitteeError> {
        let schedule = EpochSchedule::new(chain_id, epoch_length, epoch_offset)?;
        let lock = self.chain_lock(chain_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.store.committee(chain_id)?.is_some() {
            return Err(CommitteeError::ChainAlreadyRegistered(chain_id));
        }
        self.store
            .put_committee(ChainCommittee::new(chain_id, schedule))?;
        info!(chain_id, epoch_length, epoch_offset, "registered chain");
        Ok(())
    }

    /// Appends the operator to the chain's committee and returns the new next root
    pub fn subscribe(
        &self,
        chain_id: ChainId,
        identity: &OperatorId,
        current_block: BlockNumber,
    ) -> Result<CommitteeRoot, CommitteeError> {
        let span = span!(Level::TRACE, "subscribe", chain_id);
        let _enter = span.enter();

        let next = self.update(chain_id, |committee| {
            let operator = self
                .store
                .operator(identity)?
                .ok_or(CommitteeError::UnknownOperator(*identity))?;
            if committee.is_subscribed(identity) {
                return Err(CommitteeError::AlreadySubscribed {
                    chain_id,
                    operator: *identity,
                });
            }
            if operator.is_expired(current_block) {
                return Err(CommitteeError::OperatorExpired {
                    operator: *identity,
                    expiry_block: operator.expiry_block,
                    current_block,
                });
            }
            committee.subscribe(&operator)?;
            Ok(*committee.next())
        })?;
        info!(operator = %identity, members = next.leaf_count, "subscribed");
        Ok(next)
    }

    /// Removes the operator from the chain's committee, keeping the order of the remaining
    /// members, and returns the new next root
    pub fn unsubscribe(
        &self,
        chain_id: ChainId,
        identity: &OperatorId,
    ) -> Result<CommitteeRoot, CommitteeError> {
        let span = span!(Level::TRACE, "unsubscribe", chain_id);
        let _enter = span.enter();

        let next = self.update(chain_id, |committee| {
            committee.unsubscribe(identity)?;
            Ok(*committee.next())
        })?;
        info!(operator = %identity, members = next.leaf_count, "unsubscribed");
        Ok(next)
    }

    /// Recomputes the operator's leaf from its present registry record, so stake changes
    /// reach the next root
    pub fn refresh_leaf(
        &self,
        chain_id: ChainId,
        identity: &OperatorId,
    ) -> Result<CommitteeRoot, CommitteeError> {
        self.update(chain_id, |committee| {
            let operator = self
                .store
                .operator(identity)?
                .ok_or(CommitteeError::UnknownOperator(*identity))?;
            committee.refresh(&operator)?;
            debug!(chain_id, operator = %identity, stake = operator.stake, "refreshed leaf");
            Ok(*committee.next())
        })
    }

    /// Moves the chain into the epoch of `block_number`. Returns `false` when the chain was
    /// already rotated into that epoch.
    pub fn rotate(
        &self,
        chain_id: ChainId,
        block_number: BlockNumber,
    ) -> Result<bool, CommitteeError> {
        let span = span!(Level::TRACE, "rotate", chain_id, block_number);
        let _enter = span.enter();

        let history_epochs = self.config.history_epochs;
        let rotated = self.update(chain_id, |committee| {
            let rotated = committee.rotate(block_number, history_epochs);
            if let Err(ref e) = rotated {
                warn!("rejected rotation: {}", e);
            }
            rotated
        })?;
        if rotated {
            info!("rotated committee");
        } else {
            debug!("already rotated in this epoch");
        }
        Ok(rotated)
    }

    /// The `(current, next)` pair in force at `block_number`
    pub fn get_committee(
        &self,
        chain_id: ChainId,
        block_number: BlockNumber,
    ) -> Result<CommitteePair, CommitteeError> {
        self.committee(chain_id)?.committee_at(block_number)
    }

    /// Subscribed operators in leaf order
    pub fn committee_members(&self, chain_id: ChainId) -> Result<Vec<OperatorId>, CommitteeError> {
        Ok(self
            .committee(chain_id)?
            .leaves()
            .iter()
            .map(|leaf| leaf.operator)
            .collect())
    }

    pub fn is_subscribed(
        &self,
        chain_id: ChainId,
        identity: &OperatorId,
    ) -> Result<bool, CommitteeError> {
        Ok(self.committee(chain_id)?.is_subscribed(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use crate::{merkle::compute_root, operator::IDENTITY_BYTES, MemoryStore, OperatorRegistry};
    use committee_crypto::test_helpers::keygen;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;
    use std::thread;

    struct Setup {
        registry: OperatorRegistry<MemoryStore>,
        accumulator: CommitteeAccumulator<MemoryStore>,
    }

    fn setup(history_epochs: usize) -> Setup {
        let store = Arc::new(MemoryStore::default());
        let config = CommitteeConfig {
            history_epochs,
            ..Default::default()
        };
        Setup {
            registry: OperatorRegistry::new(store.clone()),
            accumulator: CommitteeAccumulator::new(store, config),
        }
    }

    fn add_operators(registry: &OperatorRegistry<MemoryStore>, n: u8) -> Vec<OperatorId> {
        let rng = &mut XorShiftRng::seed_from_u64(7);
        (0..n)
            .map(|i| {
                let id = OperatorId([i + 1; IDENTITY_BYTES]);
                let (_, pk) = keygen(rng);
                registry.add_operator(id, &pk.to_be_bytes(), 10_000).unwrap();
                id
            })
            .collect()
    }

    fn reference_root(registry: &OperatorRegistry<MemoryStore>, ids: &[OperatorId]) -> Fr {
        let leaves = ids
            .iter()
            .map(|id| registry.operator(id).unwrap().leaf_hash())
            .collect::<Vec<_>>();
        compute_root(&leaves)
    }

    #[test]
    fn registers_chains_once() {
        let Setup { accumulator, .. } = setup(4);
        accumulator.register_chain(1, 100, 0).unwrap();
        assert_eq!(
            accumulator.register_chain(1, 50, 0),
            Err(CommitteeError::ChainAlreadyRegistered(1))
        );
        assert_eq!(
            accumulator.register_chain(2, 0, 0),
            Err(CommitteeError::InvalidChainParams { chain_id: 2 })
        );
        assert_eq!(
            *accumulator.committee(1).unwrap().schedule(),
            EpochSchedule::new(1, 100, 0).unwrap()
        );
        assert_eq!(
            accumulator.get_committee(2, 0),
            Err(CommitteeError::ChainNotRegistered(2))
        );

        // calls naming unregistered chains leave no lock behind
        let stranger = OperatorId([0xff; IDENTITY_BYTES]);
        for chain_id in 100..200 {
            assert!(accumulator.subscribe(chain_id, &stranger, 0).is_err());
            assert!(accumulator.rotate(chain_id, 0).is_err());
        }
        let locks = accumulator.locks.lock().unwrap();
        assert_eq!(locks.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn subscription_checks() {
        let Setup {
            registry,
            accumulator,
        } = setup(4);
        let ids = add_operators(&registry, 2);
        let stranger = OperatorId([0xff; IDENTITY_BYTES]);

        assert_eq!(
            accumulator.subscribe(1, &ids[0], 0),
            Err(CommitteeError::ChainNotRegistered(1))
        );
        accumulator.register_chain(1, 100, 0).unwrap();
        assert_eq!(
            accumulator.subscribe(1, &stranger, 0),
            Err(CommitteeError::UnknownOperator(stranger))
        );
        assert_eq!(
            accumulator.subscribe(1, &ids[0], 10_000),
            Err(CommitteeError::OperatorExpired {
                operator: ids[0],
                expiry_block: 10_000,
                current_block: 10_000,
            })
        );
        accumulator.subscribe(1, &ids[0], 9_999).unwrap();
        assert_eq!(
            accumulator.subscribe(1, &ids[0], 0),
            Err(CommitteeError::AlreadySubscribed {
                chain_id: 1,
                operator: ids[0]
            })
        );
        assert_eq!(
            accumulator.unsubscribe(1, &ids[1]),
            Err(CommitteeError::NotSubscribed {
                chain_id: 1,
                operator: ids[1]
            })
        );
        // rejected mutations leave the committee untouched
        assert_eq!(accumulator.committee_members(1).unwrap(), vec![ids[0]]);
        assert_eq!(registry.subscribed_chains(&ids[0]).unwrap(), vec![1]);
        assert!(registry.subscribed_chains(&ids[1]).unwrap().is_empty());
    }

    #[test]
    fn stake_changes_are_lazy() {
        let Setup {
            registry,
            accumulator,
        } = setup(4);
        let ids = add_operators(&registry, 2);
        accumulator.register_chain(1, 100, 0).unwrap();
        for id in &ids {
            accumulator.subscribe(1, id, 0).unwrap();
        }
        let before = accumulator.committee(1).unwrap().next().root;

        registry.set_stake(&ids[0], 42).unwrap();
        assert_eq!(accumulator.committee(1).unwrap().next().root, before);

        let next = accumulator.refresh_leaf(1, &ids[0]).unwrap();
        assert_eq!(next.root, reference_root(&registry, &ids));
        assert_eq!(next.total_stake, 42);
        assert_ne!(next.root, before);
    }

    #[test]
    fn rotation_promotes_next() {
        let Setup {
            registry,
            accumulator,
        } = setup(4);
        let ids = add_operators(&registry, 3);
        accumulator.register_chain(7, 10, 5).unwrap();
        // no epoch is in force before the first rotation
        assert_eq!(
            accumulator.get_committee(7, 5),
            Err(CommitteeError::EpochNotReady {
                chain_id: 7,
                block_number: 5
            })
        );

        accumulator.subscribe(7, &ids[0], 0).unwrap();
        assert!(accumulator.rotate(7, 5).unwrap());
        let pair = accumulator.get_committee(7, 9).unwrap();
        assert_eq!(pair.current.root, reference_root(&registry, &ids[..1]));
        assert_eq!(pair.next.root, pair.current.root);

        accumulator.subscribe(7, &ids[1], 0).unwrap();
        accumulator.subscribe(7, &ids[2], 0).unwrap();
        // the pair in force is a snapshot, next subscriptions show up in the live next root only
        assert_eq!(accumulator.get_committee(7, 9).unwrap().current, pair.current);
        assert_eq!(
            accumulator.get_committee(7, 9).unwrap().next.root,
            reference_root(&registry, &ids)
        );
        assert!(!accumulator.rotate(7, 14).unwrap());
        assert_eq!(
            accumulator.rotate(7, 4),
            Err(CommitteeError::EpochNotReady {
                chain_id: 7,
                block_number: 4
            })
        );

        assert!(accumulator.rotate(7, 15).unwrap());
        let rotated = accumulator.get_committee(7, 15).unwrap();
        assert_eq!(rotated.current.root, reference_root(&registry, &ids));
        assert_eq!(rotated.current.leaf_count, 3);
        // the previous epoch is still served from history
        assert_eq!(accumulator.get_committee(7, 9).unwrap().current, pair.current);
    }

    #[test]
    fn concurrent_subscriptions_keep_every_leaf() {
        let Setup {
            registry,
            accumulator,
        } = setup(4);
        let ids = add_operators(&registry, 32);
        accumulator.register_chain(1, 100, 0).unwrap();
        accumulator.register_chain(2, 100, 0).unwrap();

        thread::scope(|s| {
            for chunk in ids.chunks(8) {
                let accumulator = &accumulator;
                s.spawn(move || {
                    for id in chunk {
                        accumulator.subscribe(1, id, 0).unwrap();
                        accumulator.subscribe(2, id, 0).unwrap();
                        // readers always observe a complete pair
                        let committee = accumulator.committee(1).unwrap();
                        let leaves = committee
                            .leaves()
                            .iter()
                            .map(|leaf| leaf.hash)
                            .collect::<Vec<_>>();
                        assert_eq!(committee.next().root, compute_root(&leaves));
                    }
                });
            }
        });

        for chain_id in [1, 2] {
            let members = accumulator.committee_members(chain_id).unwrap();
            assert_eq!(members.len(), ids.len());
            assert_eq!(
                accumulator.committee(chain_id).unwrap().next().root,
                reference_root(&registry, &members)
            );
        }
    }
}

use crate::{
    merkle::compute_root, BlockNumber, ChainId, CommitteeError, EpochIndex, EpochSchedule,
    Operator, OperatorId,
};
use ark_bn254::Fr;
use committee_crypto::PublicKey;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A subscribed operator as captured when its leaf was computed. Later stake changes do not
/// reach the leaf until the operator is refreshed or re-subscribed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitteeLeaf {
    pub operator: OperatorId,
    pub public_key: PublicKey,
    pub stake: u64,
    pub hash: Fr,
}

impl From<&Operator> for CommitteeLeaf {
    fn from(operator: &Operator) -> Self {
        Self {
            operator: operator.identity,
            public_key: operator.public_key,
            stake: operator.stake,
            hash: operator.leaf_hash(),
        }
    }
}

/// A committee snapshot: the Merkle root over a leaf sequence together with the aggregate
/// BLS key, total stake and size of the same sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitteeRoot {
    pub root: Fr,
    pub aggregate_key: PublicKey,
    pub total_stake: u128,
    pub leaf_count: u32,
}

impl CommitteeRoot {
    /// The snapshot of a committee without members. Its root is the zero hash, which is a
    /// valid root.
    pub fn empty() -> Self {
        Self::from_leaves(&[])
    }

    pub fn from_leaves(leaves: &[CommitteeLeaf]) -> Self {
        let hashes = leaves.iter().map(|leaf| leaf.hash).collect::<Vec<_>>();
        Self {
            root: compute_root(&hashes),
            aggregate_key: PublicKey::aggregate(leaves.iter().map(|leaf| &leaf.public_key)),
            total_stake: leaves.iter().map(|leaf| u128::from(leaf.stake)).sum(),
            leaf_count: u32::try_from(leaves.len()).unwrap_or(u32::MAX),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }
}

/// The `(current, next)` pair in force during one epoch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitteePair {
    pub current: CommitteeRoot,
    pub next: CommitteeRoot,
}

impl CommitteePair {
    pub fn roots(&self) -> (Fr, Fr) {
        (self.current.root, self.next.root)
    }
}

/// Committee state of a single chain.
///
/// Leaves are kept in subscription order in a dense vector, with a side index from operator
/// identity to position. Removing an operator shifts every later leaf one position to the
/// left, which changes the root exactly as re-subscribing the survivors in order would.
#[derive(Clone, Debug)]
pub struct ChainCommittee {
    chain_id: ChainId,
    schedule: EpochSchedule,
    leaves: Vec<CommitteeLeaf>,
    positions: HashMap<OperatorId, usize>,
    current: CommitteeRoot,
    next: CommitteeRoot,
    first_epoch: Option<EpochIndex>,
    rotated_epoch: Option<EpochIndex>,
    history: BTreeMap<EpochIndex, CommitteePair>,
}

impl ChainCommittee {
    pub fn new(chain_id: ChainId, schedule: EpochSchedule) -> Self {
        Self {
            chain_id,
            schedule,
            leaves: Vec::new(),
            positions: HashMap::new(),
            current: CommitteeRoot::empty(),
            next: CommitteeRoot::empty(),
            first_epoch: None,
            rotated_epoch: None,
            history: BTreeMap::new(),
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    pub fn leaves(&self) -> &[CommitteeLeaf] {
        &self.leaves
    }

    pub fn position(&self, operator: &OperatorId) -> Option<usize> {
        self.positions.get(operator).copied()
    }

    pub fn is_subscribed(&self, operator: &OperatorId) -> bool {
        self.positions.contains_key(operator)
    }

    pub fn current(&self) -> &CommitteeRoot {
        &self.current
    }

    pub fn next(&self) -> &CommitteeRoot {
        &self.next
    }

    /// The last epoch the committee was rotated into
    pub fn rotated_epoch(&self) -> Option<EpochIndex> {
        self.rotated_epoch
    }

    /// Appends the operator's leaf at the next free index and recomputes the next root
    pub fn subscribe(&mut self, operator: &Operator) -> Result<(), CommitteeError> {
        if self.is_subscribed(&operator.identity) {
            return Err(CommitteeError::AlreadySubscribed {
                chain_id: self.chain_id,
                operator: operator.identity,
            });
        }
        self.positions.insert(operator.identity, self.leaves.len());
        self.leaves.push(CommitteeLeaf::from(operator));
        self.recompute_next();
        Ok(())
    }

    /// Removes the operator's leaf, shifting every later leaf left by one, and recomputes the
    /// next root
    pub fn unsubscribe(&mut self, operator: &OperatorId) -> Result<(), CommitteeError> {
        let position = self.positions.remove(operator).ok_or(CommitteeError::NotSubscribed {
            chain_id: self.chain_id,
            operator: *operator,
        })?;
        self.leaves.remove(position);
        for leaf in &self.leaves[position..] {
            if let Some(index) = self.positions.get_mut(&leaf.operator) {
                *index -= 1;
            }
        }
        self.recompute_next();
        Ok(())
    }

    /// Recomputes a subscribed operator's leaf from its present record, in place
    pub fn refresh(&mut self, operator: &Operator) -> Result<(), CommitteeError> {
        let position = self
            .position(&operator.identity)
            .ok_or(CommitteeError::NotSubscribed {
                chain_id: self.chain_id,
                operator: operator.identity,
            })?;
        if let Some(leaf) = self.leaves.get_mut(position) {
            *leaf = CommitteeLeaf::from(operator);
        }
        self.recompute_next();
        Ok(())
    }

    fn recompute_next(&mut self) {
        self.next = CommitteeRoot::from_leaves(&self.leaves);
        debug!(
            chain_id = self.chain_id,
            leaves = self.leaves.len(),
            "recomputed next committee root"
        );
    }

    /// Promotes the next root to current and recomputes next from the leaf sequence.
    ///
    /// Returns `Ok(false)` if the committee was already rotated into the epoch of
    /// `block_number`. Blocks before the chain's first epoch or before the last rotated epoch
    /// are rejected. The outgoing pair is kept in the history, which is pruned to its
    /// `history_epochs` most recent entries.
    pub fn rotate(
        &mut self,
        block_number: BlockNumber,
        history_epochs: usize,
    ) -> Result<bool, CommitteeError> {
        let not_ready = CommitteeError::EpochNotReady {
            chain_id: self.chain_id,
            block_number,
        };
        let epoch = self.schedule.epoch_index(block_number).ok_or(not_ready.clone())?;
        if let Some(last) = self.rotated_epoch {
            if epoch == last {
                return Ok(false);
            }
            if epoch < last {
                return Err(not_ready);
            }
            self.history.insert(last, self.pair());
            while self.history.len() > history_epochs {
                self.history.pop_first();
            }
        }
        self.current = self.next;
        self.next = CommitteeRoot::from_leaves(&self.leaves);
        self.first_epoch.get_or_insert(epoch);
        self.rotated_epoch = Some(epoch);
        Ok(true)
    }

    fn pair(&self) -> CommitteePair {
        CommitteePair {
            current: self.current,
            next: self.next,
        }
    }

    /// The pair in force at `block_number`: the live pair for the last rotated epoch, or the
    /// pair of the most recent rotation at or before an earlier epoch. Epochs before the first
    /// rotation were never served and are not ready; epochs pruned from the history are
    /// unavailable.
    pub fn committee_at(&self, block_number: BlockNumber) -> Result<CommitteePair, CommitteeError> {
        let not_ready = CommitteeError::EpochNotReady {
            chain_id: self.chain_id,
            block_number,
        };
        let epoch = self.schedule.epoch_index(block_number).ok_or(not_ready.clone())?;
        let last = self.rotated_epoch.ok_or(not_ready.clone())?;
        if epoch > last || self.first_epoch.map_or(true, |first| epoch < first) {
            return Err(not_ready);
        }
        if epoch == last {
            return Ok(self.pair());
        }
        self.history
            .range(..=epoch)
            .next_back()
            .map(|(_, pair)| *pair)
            .ok_or(CommitteeError::EpochUnavailable {
                chain_id: self.chain_id,
                epoch,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{merkle::zero_hash, operator::IDENTITY_BYTES};
    use committee_crypto::test_helpers::keygen;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn operators(n: u8) -> Vec<Operator> {
        let rng = &mut XorShiftRng::seed_from_u64(42);
        (0..n)
            .map(|i| {
                let (_, pk) = keygen(rng);
                let mut op = Operator::new(OperatorId([i; IDENTITY_BYTES]), pk, u64::MAX);
                op.stake = u64::from(i) + 1;
                op
            })
            .collect()
    }

    fn committee() -> ChainCommittee {
        ChainCommittee::new(1, EpochSchedule::new(1, 100, 0).unwrap())
    }

    fn reference_root(operators: &[&Operator]) -> Fr {
        compute_root(&operators.iter().map(|op| op.leaf_hash()).collect::<Vec<_>>())
    }

    #[test]
    fn subscribe_then_unsubscribe_restores_the_empty_root() {
        let ops = operators(1);
        let mut committee = committee();
        committee.subscribe(&ops[0]).unwrap();
        assert_eq!(committee.next().root, ops[0].leaf_hash());
        committee.unsubscribe(&ops[0].identity).unwrap();
        assert_eq!(*committee.next(), CommitteeRoot::empty());
        assert_eq!(committee.next().root, zero_hash());
    }

    #[test]
    fn sequential_subscriptions_match_a_padded_tree() {
        let ops = operators(7);
        let mut committee = committee();
        for (n, op) in ops.iter().enumerate() {
            committee.subscribe(op).unwrap();
            let subscribed = ops[..=n].iter().collect::<Vec<_>>();
            assert_eq!(committee.next().root, reference_root(&subscribed));
            assert_eq!(committee.position(&op.identity), Some(n));
        }
        assert_eq!(committee.next().leaf_count, 7);
        assert_eq!(committee.next().total_stake, (1..=7).sum::<u128>());
        assert_eq!(
            committee.next().aggregate_key,
            PublicKey::aggregate(ops.iter().map(|op| &op.public_key))
        );
    }

    #[test]
    fn removals_preserve_relative_order() {
        let ops = operators(8);
        let mut committee = committee();
        for op in &ops {
            committee.subscribe(op).unwrap();
        }

        // first, second to last and an interior member
        for removed in [0, 6, 3] {
            committee.unsubscribe(&ops[removed].identity).unwrap();
        }
        let survivors = [1, 2, 4, 5, 7].iter().map(|i| &ops[*i]).collect::<Vec<_>>();
        assert_eq!(committee.next().root, reference_root(&survivors));
        for (position, op) in survivors.iter().enumerate() {
            assert_eq!(committee.position(&op.identity), Some(position));
        }

        // one more interior member
        committee.unsubscribe(&ops[4].identity).unwrap();
        let survivors = [1, 2, 5, 7].iter().map(|i| &ops[*i]).collect::<Vec<_>>();
        assert_eq!(committee.next().root, reference_root(&survivors));
        assert_eq!(committee.position(&ops[7].identity), Some(3));
    }

    #[test]
    fn rejects_double_subscription_and_unknown_removal() {
        let ops = operators(2);
        let mut committee = committee();
        committee.subscribe(&ops[0]).unwrap();
        let root = committee.next().root;
        assert_eq!(
            committee.subscribe(&ops[0]),
            Err(CommitteeError::AlreadySubscribed {
                chain_id: 1,
                operator: ops[0].identity
            })
        );
        assert_eq!(
            committee.unsubscribe(&ops[1].identity),
            Err(CommitteeError::NotSubscribed {
                chain_id: 1,
                operator: ops[1].identity
            })
        );
        assert_eq!(committee.next().root, root);
    }

    #[test]
    fn refresh_picks_up_stake_changes() {
        let mut ops = operators(3);
        let mut committee = committee();
        for op in &ops {
            committee.subscribe(op).unwrap();
        }
        ops[1].stake = 1_000;
        // the leaf is stale until refreshed
        assert_ne!(committee.next().root, reference_root(&ops.iter().collect::<Vec<_>>()));
        committee.refresh(&ops[1]).unwrap();
        assert_eq!(committee.next().root, reference_root(&ops.iter().collect::<Vec<_>>()));
        assert_eq!(committee.position(&ops[1].identity), Some(1));
    }

    #[test]
    fn rotation_is_idempotent_within_an_epoch() {
        let ops = operators(2);
        let mut committee = committee();
        committee.subscribe(&ops[0]).unwrap();
        assert!(committee.rotate(0, 4).unwrap());
        let pair = committee.committee_at(50).unwrap();
        assert_eq!(pair.current.root, ops[0].leaf_hash());

        committee.subscribe(&ops[1]).unwrap();
        assert!(!committee.rotate(99, 4).unwrap());
        assert_eq!(committee.committee_at(50).unwrap().current, pair.current);
    }

    #[test]
    fn rejects_out_of_order_rotations() {
        let mut committee = ChainCommittee::new(1, EpochSchedule::new(1, 100, 1_000).unwrap());
        // before the first epoch
        assert_eq!(
            committee.rotate(999, 4),
            Err(CommitteeError::EpochNotReady {
                chain_id: 1,
                block_number: 999
            })
        );
        assert!(committee.rotate(1_200, 4).unwrap());
        // before the start of the last rotated epoch
        assert_eq!(
            committee.rotate(1_150, 4),
            Err(CommitteeError::EpochNotReady {
                chain_id: 1,
                block_number: 1_150
            })
        );
    }

    #[test]
    fn serves_history_and_prunes_it() {
        let ops = operators(4);
        let mut committee = committee();
        let mut frozen = Vec::new();
        for (epoch, op) in ops.iter().enumerate() {
            let epoch = epoch as u64;
            committee.subscribe(op).unwrap();
            if epoch > 0 {
                // the outgoing pair as it stands when rotated out
                frozen.push(committee.committee_at((epoch - 1) * 100).unwrap());
            }
            committee.rotate(epoch * 100, 2).unwrap();
        }
        // live pair plus two historical pairs
        let live = committee.committee_at(350).unwrap();
        assert_eq!(live.current.leaf_count, 4);
        assert_eq!(committee.committee_at(250).unwrap(), frozen[2]);
        assert_eq!(committee.committee_at(150).unwrap(), frozen[1]);
        assert_eq!(
            committee.committee_at(50),
            Err(CommitteeError::EpochUnavailable {
                chain_id: 1,
                epoch: 0
            })
        );
        // not rotated into yet
        assert_eq!(
            committee.committee_at(400),
            Err(CommitteeError::EpochNotReady {
                chain_id: 1,
                block_number: 400
            })
        );
    }

    #[test]
    fn epochs_before_the_first_rotation_are_not_ready() {
        let ops = operators(1);
        let mut committee = committee();
        committee.subscribe(&ops[0]).unwrap();
        assert!(committee.rotate(500, 2).unwrap());
        assert_eq!(
            committee.committee_at(50),
            Err(CommitteeError::EpochNotReady {
                chain_id: 1,
                block_number: 50
            })
        );
        assert_eq!(committee.committee_at(550).unwrap().current.leaf_count, 1);

        // once the history fills up, the oldest epochs are pruned instead
        for epoch in 6..10u64 {
            committee.rotate(epoch * 100, 2).unwrap();
        }
        assert_eq!(
            committee.committee_at(550),
            Err(CommitteeError::EpochUnavailable {
                chain_id: 1,
                epoch: 5
            })
        );
        assert_eq!(
            committee.committee_at(450),
            Err(CommitteeError::EpochNotReady {
                chain_id: 1,
                block_number: 450
            })
        );
    }

    #[test]
    fn skipped_epochs_resolve_to_the_previous_rotation() {
        let ops = operators(2);
        let mut committee = committee();
        committee.subscribe(&ops[0]).unwrap();
        committee.rotate(100, 8).unwrap();
        let first = committee.committee_at(100).unwrap();
        committee.subscribe(&ops[1]).unwrap();
        committee.rotate(500, 8).unwrap();
        assert_eq!(committee.committee_at(300).unwrap().current, first.current);
        assert_eq!(
            committee.committee_at(500).unwrap().current.root,
            reference_root(&ops.iter().collect::<Vec<_>>())
        );
    }
}

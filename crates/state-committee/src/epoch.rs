use crate::{BlockNumber, ChainId, CommitteeError, CommitteeStore, EpochIndex};
use std::sync::Arc;

/// A chain's epoch layout: epoch `e` spans blocks
/// `[offset + e * length, offset + (e + 1) * length)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochSchedule {
    length: u64,
    offset: BlockNumber,
}

impl EpochSchedule {
    pub fn new(
        chain_id: ChainId,
        length: u64,
        offset: BlockNumber,
    ) -> Result<Self, CommitteeError> {
        if length == 0 {
            return Err(CommitteeError::InvalidChainParams { chain_id });
        }
        Ok(Self { length, offset })
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn offset(&self) -> BlockNumber {
        self.offset
    }

    /// `floor((block_number - offset) / length)`, or `None` before the first epoch
    pub fn epoch_index(&self, block_number: BlockNumber) -> Option<EpochIndex> {
        block_number
            .checked_sub(self.offset)
            .map(|since_offset| since_offset / self.length)
    }

    /// Only the first block of an epoch may update the committee
    pub fn is_updatable(&self, block_number: BlockNumber) -> bool {
        block_number
            .checked_sub(self.offset)
            .map_or(false, |since_offset| since_offset % self.length == 0)
    }

    pub fn start_block(&self, epoch: EpochIndex) -> Option<BlockNumber> {
        epoch
            .checked_mul(self.length)
            .and_then(|start| start.checked_add(self.offset))
    }

    /// Last block of the epoch, inclusive
    pub fn end_block(&self, epoch: EpochIndex) -> Option<BlockNumber> {
        self.start_block(epoch)
            .and_then(|start| start.checked_add(self.length - 1))
    }
}

/// Answers epoch questions for registered chains
pub struct EpochScheduler<S> {
    store: Arc<S>,
}

impl<S: CommitteeStore> EpochScheduler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn schedule(&self, chain_id: ChainId) -> Result<EpochSchedule, CommitteeError> {
        self.store
            .committee(chain_id)?
            .map(|committee| *committee.schedule())
            .ok_or(CommitteeError::ChainNotRegistered(chain_id))
    }

    pub fn epoch_index(
        &self,
        chain_id: ChainId,
        block_number: BlockNumber,
    ) -> Result<EpochIndex, CommitteeError> {
        self.schedule(chain_id)?
            .epoch_index(block_number)
            .ok_or(CommitteeError::EpochNotReady {
                chain_id,
                block_number,
            })
    }

    pub fn is_updatable(
        &self,
        chain_id: ChainId,
        block_number: BlockNumber,
    ) -> Result<bool, CommitteeError> {
        Ok(self.schedule(chain_id)?.is_updatable(block_number))
    }

    pub fn epoch_start_block(
        &self,
        chain_id: ChainId,
        epoch: EpochIndex,
    ) -> Result<Option<BlockNumber>, CommitteeError> {
        Ok(self.schedule(chain_id)?.start_block(epoch))
    }

    pub fn epoch_end_block(
        &self,
        chain_id: ChainId,
        epoch: EpochIndex,
    ) -> Result<Option<BlockNumber>, CommitteeError> {
        Ok(self.schedule(chain_id)?.end_block(epoch))
    }
}

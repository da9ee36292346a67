//! Consensus state aggregate
//!
//! Owns the commitment store, the epoch assignment table, the accepted-block
//! ledger and the finality frontier. All mutations go through methods that
//! record an undo entry in a [`Journal`].
//!
//! ## Invariants
//!
//! - At most one commitment per `(height, attester)`, never overwritten.
//! - Accumulated stake per `(height, commitment_hash)` never decreases
//!   outside of a journal rollback.
//! - An epoch bound to a height never changes.
//! - Accepted heights are exactly `initial_frontier + 1 ..= frontier`.

use super::commitment::{AttesterId, BlockCommitment, BlockHeight, Epoch, Hash, HeightState, Stake};
use super::journal::{Journal, JournalEntry};
use crate::error::{SettlementError, SettlementResult};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsensusState {
    /// How far ahead of the frontier a commitment may target
    leading_block_tolerance: u64,
    /// Frontier: highest accepted height
    last_accepted_height: BlockHeight,
    /// (height, attester) -> commitment
    commitments: HashMap<(BlockHeight, AttesterId), BlockCommitment>,
    /// (height, commitment hash) -> accumulated stake
    commitment_stakes: HashMap<(BlockHeight, Hash), Stake>,
    /// height -> epoch active when the first commitment arrived
    epochs: HashMap<BlockHeight, Epoch>,
    /// height -> accepted commitment
    accepted: BTreeMap<BlockHeight, BlockCommitment>,
}

impl ConsensusState {
    pub fn new(leading_block_tolerance: u64, initial_accepted_height: BlockHeight) -> Self {
        Self {
            leading_block_tolerance,
            last_accepted_height: initial_accepted_height,
            ..Self::default()
        }
    }

    pub fn leading_block_tolerance(&self) -> u64 {
        self.leading_block_tolerance
    }

    pub fn last_accepted_height(&self) -> BlockHeight {
        self.last_accepted_height
    }

    /// `frontier + tolerance`, recomputed on every call.
    pub fn max_tolerable_height(&self) -> BlockHeight {
        self.last_accepted_height
            .saturating_add(self.leading_block_tolerance)
    }

    /// Reject a submission without touching state.
    pub fn validate_submission(
        &self,
        height: BlockHeight,
        attester: &AttesterId,
    ) -> SettlementResult<()> {
        if height == 0 {
            return Err(SettlementError::InvalidHeight { height });
        }
        if self.commitments.contains_key(&(height, *attester)) {
            return Err(SettlementError::AlreadyCommitted {
                height,
                attester: *attester,
            });
        }
        let max_tolerable = self.max_tolerable_height();
        if height >= max_tolerable {
            return Err(SettlementError::TooFarAhead {
                height,
                max_tolerable,
            });
        }
        Ok(())
    }

    pub fn commitment(&self, height: BlockHeight, attester: &AttesterId) -> Option<BlockCommitment> {
        self.commitments.get(&(height, *attester)).copied()
    }

    pub fn accepted_commitment(&self, height: BlockHeight) -> Option<BlockCommitment> {
        self.accepted.get(&height).copied()
    }

    pub fn height_state(&self, height: BlockHeight) -> HeightState {
        if self.accepted.contains_key(&height) {
            HeightState::Accepted
        } else {
            HeightState::Pending
        }
    }

    pub fn epoch_for(&self, height: BlockHeight) -> Option<Epoch> {
        self.epochs.get(&height).copied()
    }

    pub fn commitment_stake(&self, height: BlockHeight, commitment_hash: &Hash) -> Stake {
        self.commitment_stakes
            .get(&(height, *commitment_hash))
            .copied()
            .unwrap_or(0)
    }

    /// Accepted commitments in height order.
    pub fn accepted_blocks(&self) -> impl Iterator<Item = &BlockCommitment> {
        self.accepted.values()
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    /// Bind `height` to the epoch produced by `current_epoch_by_time` unless
    /// it is already bound. Returns the bound epoch either way.
    pub fn assign_epoch_if_unset<F>(
        &mut self,
        height: BlockHeight,
        current_epoch_by_time: F,
        journal: &mut Journal,
    ) -> SettlementResult<Epoch>
    where
        F: FnOnce() -> SettlementResult<Epoch>,
    {
        if let Some(epoch) = self.epochs.get(&height) {
            return Ok(*epoch);
        }
        let epoch = current_epoch_by_time()?;
        self.epochs.insert(height, epoch);
        journal.record(JournalEntry::EpochBound { height });
        Ok(epoch)
    }

    /// Store a commitment. Callers validate first; a duplicate key is refused
    /// here as well so the write-once guarantee never depends on call order.
    pub fn record_commitment(
        &mut self,
        attester: AttesterId,
        commitment: BlockCommitment,
        journal: &mut Journal,
    ) -> SettlementResult<()> {
        let key = (commitment.height, attester);
        if self.commitments.contains_key(&key) {
            return Err(SettlementError::AlreadyCommitted {
                height: commitment.height,
                attester,
            });
        }
        self.commitments.insert(key, commitment);
        journal.record(JournalEntry::CommitmentStored {
            height: commitment.height,
            attester,
        });
        Ok(())
    }

    /// Add `amount` to the bucket of `(height, commitment_hash)` and return the new total.
    pub fn add_commitment_stake(
        &mut self,
        height: BlockHeight,
        commitment_hash: Hash,
        amount: Stake,
        journal: &mut Journal,
    ) -> Stake {
        let key = (height, commitment_hash);
        let previous = self.commitment_stakes.get(&key).copied();
        let updated = previous.unwrap_or(0).saturating_add(amount);
        self.commitment_stakes.insert(key, updated);
        journal.record(JournalEntry::StakeAdded {
            height,
            commitment_hash,
            previous,
        });
        updated
    }

    /// Write the accepted block for `frontier + 1` and advance the frontier.
    pub fn accept(
        &mut self,
        commitment: BlockCommitment,
        journal: &mut Journal,
    ) -> SettlementResult<()> {
        let height = commitment.height;
        if self.accepted.contains_key(&height) || height <= self.last_accepted_height {
            return Err(SettlementError::AlreadyAccepted { height });
        }
        debug_assert_eq!(Some(height), self.last_accepted_height.checked_add(1));

        let previous_frontier = self.last_accepted_height;
        self.accepted.insert(height, commitment);
        self.last_accepted_height = height;
        journal.record(JournalEntry::BlockAccepted {
            height,
            previous_frontier,
        });
        Ok(())
    }

    /// Undo every mutation recorded in `journal`, most recent first.
    pub fn rollback(&mut self, journal: &mut Journal) {
        for entry in journal.drain_reversed() {
            match entry {
                JournalEntry::EpochBound { height } => {
                    self.epochs.remove(&height);
                }
                JournalEntry::CommitmentStored { height, attester } => {
                    self.commitments.remove(&(height, attester));
                }
                JournalEntry::StakeAdded {
                    height,
                    commitment_hash,
                    previous,
                } => match previous {
                    Some(stake) => {
                        self.commitment_stakes.insert((height, commitment_hash), stake);
                    }
                    None => {
                        self.commitment_stakes.remove(&(height, commitment_hash));
                    }
                },
                JournalEntry::BlockAccepted {
                    height,
                    previous_frontier,
                } => {
                    self.accepted.remove(&height);
                    self.last_accepted_height = previous_frontier;
                }
            }
        }
    }
}

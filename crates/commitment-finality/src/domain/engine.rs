//! # Acceptance Engine
//!
//! Drives the supermajority check and the cascading finalization loop.
//!
//! ## Per-height lifecycle
//!
//! ```text
//! [PENDING] ──commitment stake > floor(2/3 · epoch stake)──→ [ACCEPTED]
//! ```
//!
//! ## Cascade
//!
//! After every successful submission the engine ticks `frontier + 1` until a
//! tick leaves the height pending. Commitments submitted ahead of the
//! frontier are therefore finalized as soon as their predecessor is.
//!
//! ## Tie-break
//!
//! A tick walks the attester registry in order and asks, for each attester,
//! whether *that attester's* commitment already clears the bar. The first
//! one that does wins. Distinct hashes are never compared with each other.

use super::commitment::{
    short_hex, AttesterId, BlockCommitment, BlockHeight, Epoch, Stake,
};
use super::journal::Journal;
use super::slashing::SlashingContext;
use super::store::ConsensusState;
use super::threshold::{exceeds_threshold, supermajority_threshold};
use crate::error::{SettlementError, SettlementResult};
use crate::ports::outbound::{SlashingHook, StakeOracle};
use tracing::{debug, info, warn};

/// A height finalized during one submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptedBlock {
    pub commitment: BlockCommitment,
    pub epoch: Epoch,
    /// Stake behind the accepted commitment
    pub backing_stake: Stake,
    /// Total stake of the bound epoch
    pub total_stake: Stake,
}

/// Result of one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Pending,
    Accepted(AcceptedBlock),
}

/// Result of a successful submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub attester: AttesterId,
    pub commitment: BlockCommitment,
    /// Epoch bound to the commitment's height
    pub epoch: Epoch,
    /// Submitter's current-epoch stake added by this submission
    pub attester_stake: Stake,
    /// Accumulated stake behind the commitment after this submission
    pub accumulated_stake: Stake,
    /// Heights finalized by the cascade, in ascending order
    pub accepted: Vec<AcceptedBlock>,
}

/// Stateless driver over a [`ConsensusState`] and its collaborators.
pub struct AcceptanceEngine<'a> {
    oracle: &'a dyn StakeOracle,
    slashing: &'a dyn SlashingHook,
}

impl<'a> AcceptanceEngine<'a> {
    pub fn new(oracle: &'a dyn StakeOracle, slashing: &'a dyn SlashingHook) -> Self {
        Self { oracle, slashing }
    }

    /// Record a commitment and run the cascade.
    ///
    /// Atomic with respect to `state`: on any error every change made by this
    /// call is rolled back before returning.
    pub fn submit(
        &self,
        state: &mut ConsensusState,
        attester: AttesterId,
        commitment: BlockCommitment,
    ) -> SettlementResult<SubmissionOutcome> {
        state.validate_submission(commitment.height, &attester)?;

        let mut journal = Journal::new();
        match self.apply(state, attester, commitment, &mut journal) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    height = commitment.height,
                    attester = %attester,
                    error = %e,
                    undone = journal.len(),
                    "[finality] submission failed, rolling back"
                );
                state.rollback(&mut journal);
                Err(e)
            }
        }
    }

    fn apply(
        &self,
        state: &mut ConsensusState,
        attester: AttesterId,
        commitment: BlockCommitment,
        journal: &mut Journal,
    ) -> SettlementResult<SubmissionOutcome> {
        let height = commitment.height;
        let epoch =
            state.assign_epoch_if_unset(height, || self.oracle.current_epoch_by_time(), journal)?;

        let attester_stake = self.current_epoch_stake(&attester)?;
        state.record_commitment(attester, commitment, journal)?;
        let accumulated_stake =
            state.add_commitment_stake(height, commitment.commitment_hash, attester_stake, journal);

        debug!(
            height,
            epoch,
            attester = %attester,
            commitment = %short_hex(&commitment.commitment_hash),
            attester_stake,
            accumulated_stake,
            "[finality] commitment recorded"
        );

        let accepted = self.cascade(state, journal)?;

        Ok(SubmissionOutcome {
            attester,
            commitment,
            epoch,
            attester_stake,
            accumulated_stake,
            accepted,
        })
    }

    /// Tick `frontier + 1` until it stays pending.
    pub fn cascade(
        &self,
        state: &mut ConsensusState,
        journal: &mut Journal,
    ) -> SettlementResult<Vec<AcceptedBlock>> {
        let mut accepted = Vec::new();
        while let TickOutcome::Accepted(block) = self.tick(state, journal)? {
            accepted.push(block);
        }
        if accepted.len() > 1 {
            info!(
                depth = accepted.len(),
                frontier = state.last_accepted_height(),
                "[finality] cascade finalized consecutive heights"
            );
        }
        Ok(accepted)
    }

    /// Evaluate the next unresolved height once.
    pub fn tick(
        &self,
        state: &mut ConsensusState,
        journal: &mut Journal,
    ) -> SettlementResult<TickOutcome> {
        // Frontier at the top of the height range: nothing left to accept.
        let Some(height) = Self::next_height(state) else {
            return Ok(TickOutcome::Pending);
        };

        // Nobody has committed to this height yet.
        let Some(epoch) = state.epoch_for(height) else {
            return Ok(TickOutcome::Pending);
        };

        self.catch_up_to(epoch)?;

        let total_stake = self.total_epoch_stake(epoch)?;
        let threshold = supermajority_threshold(total_stake);

        for attester in self.oracle.attesters_for_domain()? {
            let Some(commitment) = state.commitment(height, &attester) else {
                continue;
            };
            let backing_stake = state.commitment_stake(height, &commitment.commitment_hash);
            if exceeds_threshold(backing_stake, threshold) {
                let block = AcceptedBlock {
                    commitment,
                    epoch,
                    backing_stake,
                    total_stake,
                };
                self.finalize(state, journal, block)?;
                return Ok(TickOutcome::Accepted(block));
            }
        }

        Ok(TickOutcome::Pending)
    }

    fn finalize(
        &self,
        state: &mut ConsensusState,
        journal: &mut Journal,
        block: AcceptedBlock,
    ) -> SettlementResult<()> {
        let commitment = block.commitment;
        state.accept(commitment, journal)?;

        info!(
            height = commitment.height,
            epoch = block.epoch,
            block_id = %short_hex(&commitment.block_id),
            commitment = %short_hex(&commitment.commitment_hash),
            backing_stake = block.backing_stake,
            total_stake = block.total_stake,
            "[finality] ✅ block accepted"
        );

        let attesters = self.oracle.attesters_for_domain()?;
        let context = SlashingContext::build(commitment, block.epoch, &attesters, state);
        self.slashing
            .slash_minority(&context)
            .map_err(|err| match err {
                e @ SettlementError::SlashingFailed { .. } => e,
                other => SettlementError::SlashingFailed {
                    height: commitment.height,
                    reason: other.to_string(),
                },
            })?;

        if self.oracle.current_epoch_by_time()? > block.epoch {
            self.roll_over(block.epoch)?;
        }
        Ok(())
    }

    /// Roll the oracle forward until its protocol epoch reaches `target`.
    fn catch_up_to(&self, target: Epoch) -> SettlementResult<()> {
        loop {
            let current = self.oracle.current_epoch()?;
            if current >= target {
                return Ok(());
            }
            self.roll_over(current)?;
            let advanced = self.oracle.current_epoch()?;
            if advanced <= current {
                return Err(SettlementError::EpochRolloverFailed {
                    epoch: current,
                    reason: format!("oracle epoch did not advance past {}", current),
                });
            }
        }
    }

    fn roll_over(&self, epoch: Epoch) -> SettlementResult<()> {
        let rollover_failed = |e: SettlementError| match e {
            e @ SettlementError::EpochRolloverFailed { .. } => e,
            other => SettlementError::EpochRolloverFailed {
                epoch,
                reason: other.to_string(),
            },
        };
        let before = self.oracle.current_epoch().map_err(rollover_failed)?;
        self.oracle.roll_over_epoch(epoch).map_err(rollover_failed)?;
        let after = self.oracle.current_epoch().map_err(rollover_failed)?;

        if after > before {
            info!(from = before, to = after, "[finality] epoch rolled over");
        } else {
            debug!(
                requested = epoch,
                current = after,
                "[finality] rollover left oracle epoch unchanged"
            );
        }
        Ok(())
    }

    /// Sum of the attester's stake across all custodians at the protocol epoch.
    /// Each custodian carries unit weight.
    pub fn current_epoch_stake(&self, attester: &AttesterId) -> SettlementResult<Stake> {
        let epoch = self.oracle.current_epoch()?;
        self.oracle
            .custodians_for_domain()?
            .iter()
            .try_fold(0u128, |acc, custodian| {
                let stake = self
                    .oracle
                    .stake_for_attester_at_epoch(epoch, custodian, attester)?;
                Ok(acc.saturating_add(stake))
            })
    }

    /// Sum of total stake across all custodians at `epoch`.
    pub fn total_epoch_stake(&self, epoch: Epoch) -> SettlementResult<Stake> {
        self.oracle
            .custodians_for_domain()?
            .iter()
            .try_fold(0u128, |acc, custodian| {
                let stake = self.oracle.total_stake_for_epoch(epoch, custodian)?;
                Ok(acc.saturating_add(stake))
            })
    }

    /// Height the next tick will evaluate, `None` once the frontier is `u64::MAX`.
    pub fn next_height(state: &ConsensusState) -> Option<BlockHeight> {
        state.last_accepted_height().checked_add(1)
    }
}

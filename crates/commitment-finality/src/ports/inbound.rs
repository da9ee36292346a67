//! Driving Ports (API - Inbound)

use crate::domain::{
    AttesterId, BlockCommitment, BlockHeight, CustodianId, Epoch, Hash, HeightState, Stake,
};
use crate::error::SettlementResult;
use crate::events::CommitmentBatch;
use async_trait::async_trait;

/// Primary commitment finality API
///
/// This is the driving port. Every mutating call is applied as one exclusive
/// step, cascade included.
#[async_trait]
pub trait CommitmentApi: Send + Sync {
    /// Submit one commitment.
    ///
    /// # Returns
    /// * Accumulated stake behind `commitment_hash` at `height` after this submission
    ///
    /// # Errors
    /// * `AlreadyCommitted` - the attester already committed at `height`
    /// * `TooFarAhead` - `height >= frontier + tolerance`
    async fn submit_commitment(
        &self,
        attester: AttesterId,
        height: BlockHeight,
        commitment_hash: Hash,
        block_id: Hash,
    ) -> SettlementResult<Stake>;

    /// Apply a batch in order, stopping at the first failure.
    ///
    /// Items before the failing one stay applied; the error carries their
    /// accumulated stakes and the failing index.
    async fn submit_batch(&self, batch: CommitmentBatch) -> SettlementResult<Vec<Stake>>;

    async fn get_commitment(
        &self,
        height: BlockHeight,
        attester: AttesterId,
    ) -> Option<BlockCommitment>;

    async fn get_accepted_commitment(&self, height: BlockHeight) -> Option<BlockCommitment>;

    async fn get_height_state(&self, height: BlockHeight) -> HeightState;

    /// Attesters in registry order
    async fn get_attesters(&self) -> SettlementResult<Vec<AttesterId>>;

    /// `frontier + tolerance`
    async fn get_max_tolerable_height(&self) -> BlockHeight;

    async fn get_last_accepted_height(&self) -> BlockHeight;

    /// Epoch bound to `height`, if any commitment arrived for it
    async fn get_epoch_by_height(&self, height: BlockHeight) -> Option<Epoch>;

    async fn get_commitment_stake(&self, height: BlockHeight, commitment_hash: Hash) -> Stake;

    async fn get_current_epoch(&self) -> SettlementResult<Epoch>;

    async fn get_current_epoch_by_time(&self) -> SettlementResult<Epoch>;

    async fn get_attester_stake_at_epoch(
        &self,
        epoch: Epoch,
        custodian: CustodianId,
        attester: AttesterId,
    ) -> SettlementResult<Stake>;

    /// Attester stake summed over all custodians at the current epoch
    async fn get_current_epoch_stake(&self, attester: AttesterId) -> SettlementResult<Stake>;

    /// Total stake summed over all custodians at `epoch`
    async fn get_total_stake_for_epoch(&self, epoch: Epoch) -> SettlementResult<Stake>;

    /// Genesis ceremony readiness. Fails with `NotYetImplemented` unless a
    /// gate with real semantics is installed.
    async fn accept_genesis_ceremony(&self) -> SettlementResult<()>;
}

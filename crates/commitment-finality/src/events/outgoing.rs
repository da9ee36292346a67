//! Outgoing events for commitment finality
//!
//! Events are produced after a submission's state change completed and are
//! handed to a [`NotificationSink`](crate::ports::outbound::NotificationSink).
//! All events emitted for one submission share a correlation id.

use crate::domain::{
    participation_percent, AcceptedBlock, AttesterId, BlockHeight, Epoch, Hash, Stake,
};
use crate::error::SettlementError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID tying together the events of one submission
pub type CorrelationId = Uuid;

/// A commitment was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentSubmittedEvent {
    pub correlation_id: CorrelationId,
    pub attester: AttesterId,
    pub height: BlockHeight,
    pub block_id: Hash,
    pub commitment_hash: Hash,
    /// Submitter's current-epoch stake
    pub attester_stake: Stake,
    /// Stake behind the commitment after this submission
    pub accumulated_stake: Stake,
}

/// A height was finalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAcceptedEvent {
    pub correlation_id: CorrelationId,
    pub height: BlockHeight,
    pub block_id: Hash,
    pub commitment_hash: Hash,
    pub epoch: Epoch,
    pub participating_stake_percent: u8,
}

impl BlockAcceptedEvent {
    pub fn from_block(correlation_id: CorrelationId, block: &AcceptedBlock) -> Self {
        Self {
            correlation_id,
            height: block.commitment.height,
            block_id: block.commitment.block_id,
            commitment_hash: block.commitment.commitment_hash,
            epoch: block.epoch,
            participating_stake_percent: participation_percent(
                block.backing_stake,
                block.total_stake,
            ),
        }
    }
}

/// Why a submission was turned away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    AlreadyCommitted,
    TooFarAhead,
    InvalidHeight,
}

impl RejectionReason {
    /// Validation failures map to a reason; anything else is not a rejection.
    pub fn from_error(error: &SettlementError) -> Option<Self> {
        match error {
            SettlementError::AlreadyCommitted { .. } => Some(Self::AlreadyCommitted),
            SettlementError::TooFarAhead { .. } => Some(Self::TooFarAhead),
            SettlementError::InvalidHeight { .. } => Some(Self::InvalidHeight),
            _ => None,
        }
    }
}

/// A submission failed validation. Observational only: nothing was stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRejectedEvent {
    pub correlation_id: CorrelationId,
    pub attester: AttesterId,
    pub height: BlockHeight,
    pub reason: RejectionReason,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementEvent {
    CommitmentSubmitted(CommitmentSubmittedEvent),
    BlockAccepted(BlockAcceptedEvent),
    CommitmentRejected(CommitmentRejectedEvent),
}

impl SettlementEvent {
    pub fn height(&self) -> BlockHeight {
        match self {
            Self::CommitmentSubmitted(e) => e.height,
            Self::BlockAccepted(e) => e.height,
            Self::CommitmentRejected(e) => e.height,
        }
    }

    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::CommitmentSubmitted(e) => e.correlation_id,
            Self::BlockAccepted(e) => e.correlation_id,
            Self::CommitmentRejected(e) => e.correlation_id,
        }
    }

    pub fn is_acceptance(&self) -> bool {
        matches!(self, Self::BlockAccepted(_))
    }
}

//! Error types for the commitment finality engine

use crate::domain::{AttesterId, BlockHeight, CustodianId, Epoch, Stake};
use thiserror::Error;

/// Commitment finality errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettlementError {
    /// The attester already has a commitment stored at this height
    #[error("Attester {attester} already committed at height {height}")]
    AlreadyCommitted {
        height: BlockHeight,
        attester: AttesterId,
    },

    /// Height is at or beyond `frontier + tolerance`
    #[error("Height {height} too far ahead: must be below {max_tolerable}")]
    TooFarAhead {
        height: BlockHeight,
        max_tolerable: BlockHeight,
    },

    /// Height 0 is reserved
    #[error("Invalid height {height}: height 0 is reserved")]
    InvalidHeight { height: BlockHeight },

    /// Height already has an accepted commitment
    #[error("Height {height} already accepted")]
    AlreadyAccepted { height: BlockHeight },

    /// Operation exists but has no defined semantics yet
    #[error("Not yet implemented: {operation}")]
    NotYetImplemented { operation: String },

    /// Stake oracle query failed
    #[error("Stake query failed: {reason}")]
    StakeQueryFailed { reason: String },

    /// Stake oracle failed to advance its epoch
    #[error("Epoch rollover from {epoch} failed: {reason}")]
    EpochRolloverFailed { epoch: Epoch, reason: String },

    /// Slashing strategy failed
    #[error("Slashing failed at height {height}: {reason}")]
    SlashingFailed { height: BlockHeight, reason: String },

    /// Stake oracle has no registered domain
    #[error("Domain not registered with stake oracle")]
    UnknownDomain,

    /// Custodian not registered for the domain
    #[error("Unknown custodian: {custodian:?}")]
    UnknownCustodian { custodian: CustodianId },

    /// Stake ledger refused a stake movement
    #[error("Insufficient stake: have {have}, requested {requested}")]
    InsufficientStake { have: Stake, requested: Stake },

    /// Configuration rejected at startup
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A batch stopped at its first failing item; earlier items stay applied
    #[error("Batch item {index} failed after {} applied: {source}", .applied.len())]
    BatchItemFailed {
        index: usize,
        applied: Vec<Stake>,
        #[source]
        source: Box<SettlementError>,
    },
}

impl SettlementError {
    /// Submission was rejected before touching any state; the caller may retry later.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyCommitted { .. } | Self::TooFarAhead { .. } | Self::InvalidHeight { .. }
        )
    }

    /// A collaborator (stake oracle, slashing strategy) failed.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::StakeQueryFailed { .. }
                | Self::EpochRolloverFailed { .. }
                | Self::SlashingFailed { .. }
                | Self::UnknownDomain
                | Self::UnknownCustodian { .. }
        )
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadyCommitted { .. } => "already_committed",
            Self::TooFarAhead { .. } => "too_far_ahead",
            Self::InvalidHeight { .. } => "invalid_height",
            Self::AlreadyAccepted { .. } => "already_accepted",
            Self::NotYetImplemented { .. } => "not_yet_implemented",
            Self::StakeQueryFailed { .. } => "stake_query_failed",
            Self::EpochRolloverFailed { .. } => "epoch_rollover_failed",
            Self::SlashingFailed { .. } => "slashing_failed",
            Self::UnknownDomain => "unknown_domain",
            Self::UnknownCustodian { .. } => "unknown_custodian",
            Self::InsufficientStake { .. } => "insufficient_stake",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::BatchItemFailed { .. } => "batch_item_failed",
        }
    }
}

/// Result type for commitment finality operations
pub type SettlementResult<T> = Result<T, SettlementError>;

//! Events module for commitment finality

pub mod incoming;
pub mod outgoing;

pub use incoming::CommitmentBatch;
pub use outgoing::{
    BlockAcceptedEvent, CommitmentRejectedEvent, CommitmentSubmittedEvent, CorrelationId,
    RejectionReason, SettlementEvent,
};

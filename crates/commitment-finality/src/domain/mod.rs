//! Domain module for commitment finality
//!
//! Pure, synchronous state machine. Nothing in here performs I/O or awaits.
//!
//! ## Core Modules
//! - commitment: commitment entities and identifiers
//! - store: commitment store, epoch assignment table, accepted-block ledger
//! - journal: per-submission undo log
//! - threshold: supermajority arithmetic
//! - engine: acceptance engine and cascade
//! - slashing: minority identification for penalty strategies

pub mod commitment;
pub mod engine;
pub mod journal;
pub mod slashing;
pub mod store;
pub mod threshold;

pub use commitment::{
    AttesterId, BlockCommitment, BlockHeight, CustodianId, DomainId, Epoch, Hash, HeightState,
    SignedCommitment, Stake,
};
pub use engine::{AcceptanceEngine, AcceptedBlock, SubmissionOutcome, TickOutcome};
pub use journal::Journal;
pub use slashing::{MinorityOffense, MinorityRecord, SlashingContext};
pub use store::ConsensusState;
pub use threshold::{exceeds_threshold, participation_percent, supermajority_threshold};

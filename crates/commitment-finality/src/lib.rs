//! # commitment-finality
//!
//! Stake-weighted commitment aggregation with supermajority finality.
//!
//! ## Overview
//!
//! Attesters submit commitments for block heights. Each commitment carries
//! the attester's current-epoch stake. A height is accepted when one
//! commitment's accumulated stake is strictly greater than two thirds of the
//! total stake of the epoch the height was first seen in.
//!
//! - **Ordered finality**: only the height right after the frontier can be accepted
//! - **Cascade**: one submission can finalize a run of already-qualified heights
//! - **Epoch catch-up**: the stake oracle is rolled forward before any tally
//! - **Atomic submissions**: a failed submission leaves no trace in the state
//!
//! ## Architecture
//!
//! ```text
//! Attesters ──submit_commitment / submit_batch──→ SettlementService
//!                                                     │
//!                                                     ├── stake queries, rollovers ──→ StakeOracle
//!                                                     │
//!                                                     ├── minority on acceptance ──→ SlashingHook
//!                                                     │
//!                                                     └── SettlementEvent ──→ NotificationSink
//! ```
//!
//! ## Height lifecycle
//!
//! ```text
//! [PENDING] ──stake > threshold && height == frontier + 1──→ [ACCEPTED]
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use commitment_finality::{SettlementConfig, SettlementService};
//! use commitment_finality::ports::inbound::CommitmentApi;
//!
//! let service = SettlementService::new(
//!     SettlementConfig::from_env(),
//!     stake_oracle,
//!     slashing_hook,
//!     notifier,
//! )?;
//!
//! let stake = service
//!     .submit_commitment(attester, height, commitment_hash, block_id)
//!     .await?;
//!
//! let accepted = service.get_accepted_commitment(height).await;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{
    BroadcastNotifier, Clock, InMemoryEventLog, InMemoryStakeLedger, ManualClock,
    MinorityRecorder, NoopSlashingHook, SettlementEventStream, SystemClock,
    UnimplementedGenesisGate,
};
pub use config::SettlementConfig;
pub use domain::{
    AcceptanceEngine, AcceptedBlock, AttesterId, BlockCommitment, BlockHeight, ConsensusState,
    CustodianId, DomainId, Epoch, Hash, HeightState, MinorityOffense, MinorityRecord,
    SignedCommitment, SlashingContext, Stake,
};
pub use error::{SettlementError, SettlementResult};
pub use events::{CommitmentBatch, RejectionReason, SettlementEvent};
pub use ports::inbound::CommitmentApi;
pub use ports::outbound::{
    DomainRegistration, GenesisGate, NotificationSink, SlashingHook, StakeOracle,
};
pub use service::SettlementService;

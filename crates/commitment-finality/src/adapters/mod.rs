//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implementations of the outbound port traits.

mod clock;
mod genesis;
mod notifier;
mod slashing;
mod stake_ledger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use genesis::UnimplementedGenesisGate;
pub use notifier::{BroadcastNotifier, InMemoryEventLog, SettlementEventStream};
pub use slashing::{MinorityRecorder, NoopSlashingHook};
pub use stake_ledger::InMemoryStakeLedger;

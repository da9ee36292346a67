//! Ports module for commitment finality

pub mod inbound;
pub mod outbound;

pub use inbound::CommitmentApi;
pub use outbound::{DomainRegistration, GenesisGate, NotificationSink, SlashingHook, StakeOracle};

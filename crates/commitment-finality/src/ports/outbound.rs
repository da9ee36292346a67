//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The acceptance engine is synchronous: every call made through these ports
//! happens inside the critical section of a single submission.

use crate::domain::slashing::SlashingContext;
use crate::domain::{AttesterId, CustodianId, DomainId, Epoch, Stake};
use crate::error::SettlementResult;
use crate::events::SettlementEvent;

/// Registration handed to the stake oracle when the engine starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainRegistration {
    pub domain: DomainId,
    pub epoch_duration_secs: u64,
    pub custodians: Vec<CustodianId>,
}

/// Stake and epoch information for the registered domain.
///
/// CRITICAL: acceptance decisions are only as correct as the numbers returned
/// here. Any error is fatal for the submission that triggered the query.
pub trait StakeOracle: Send + Sync {
    /// Register this engine as a domain. Called once at startup.
    fn register_domain(&self, registration: &DomainRegistration) -> SettlementResult<()>;

    /// Stake held by `attester` through `custodian` at `epoch`.
    fn stake_for_attester_at_epoch(
        &self,
        epoch: Epoch,
        custodian: &CustodianId,
        attester: &AttesterId,
    ) -> SettlementResult<Stake>;

    /// Total stake held through `custodian` at `epoch`.
    fn total_stake_for_epoch(&self, epoch: Epoch, custodian: &CustodianId)
        -> SettlementResult<Stake>;

    fn custodians_for_domain(&self) -> SettlementResult<Vec<CustodianId>>;

    /// Attesters in canonical registry order. The acceptance engine iterates
    /// in exactly this order.
    fn attesters_for_domain(&self) -> SettlementResult<Vec<AttesterId>>;

    /// Protocol epoch: advances only through [`StakeOracle::roll_over_epoch`].
    fn current_epoch(&self) -> SettlementResult<Epoch>;

    /// Epoch implied by wall-clock time.
    fn current_epoch_by_time(&self) -> SettlementResult<Epoch>;

    /// Advance the protocol epoch from `epoch` to `epoch + 1`.
    fn roll_over_epoch(&self, epoch: Epoch) -> SettlementResult<()>;
}

/// Penalty strategy invoked on every acceptance.
///
/// Implementations must be idempotent and must leave majority stake untouched.
/// A strategy with nothing to penalize must return `Ok(())` without side effects.
pub trait SlashingHook: Send + Sync {
    fn slash_minority(&self, context: &SlashingContext) -> SettlementResult<()>;
}

/// Readiness check for the genesis ceremony.
pub trait GenesisGate: Send + Sync {
    fn accept_genesis_ceremony(&self) -> SettlementResult<()>;
}

/// Delivery of outgoing events.
///
/// Called after the submission's state change is complete; a sink cannot
/// fail the submission, so delivery problems are the sink's own concern.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: SettlementEvent);
}

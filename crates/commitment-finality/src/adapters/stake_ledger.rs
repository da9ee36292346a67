//! In-memory Stake Ledger Adapter
//!
//! Implements `StakeOracle` for a single registered domain. Used by tests
//! and by local deployments without an external staking contract.
//!
//! ## Epoch model
//!
//! - `current_epoch_by_time = now / epoch_duration`
//! - the protocol epoch starts at the time epoch of registration and only
//!   moves through `roll_over_epoch`
//! - stake is recorded per `(epoch, custodian, attester)`; a rollover copies
//!   the closing epoch's balances into the next one and applies pending
//!   unstakes

use super::clock::Clock;
use crate::domain::{AttesterId, CustodianId, Epoch, Stake};
use crate::error::{SettlementError, SettlementResult};
use crate::ports::outbound::{DomainRegistration, StakeOracle};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct LedgerState {
    registration: Option<DomainRegistration>,
    current_epoch: Epoch,
    /// Registry order: first stake wins the position
    attesters: Vec<AttesterId>,
    stakes: HashMap<(Epoch, CustodianId, AttesterId), Stake>,
    totals: HashMap<(Epoch, CustodianId), Stake>,
    /// Unstakes applied when the current epoch rolls over
    pending_unstakes: HashMap<(CustodianId, AttesterId), Stake>,
}

impl LedgerState {
    fn registration(&self) -> SettlementResult<&DomainRegistration> {
        self.registration
            .as_ref()
            .ok_or(SettlementError::UnknownDomain)
    }

    fn ensure_custodian(&self, custodian: &CustodianId) -> SettlementResult<()> {
        if self.registration()?.custodians.contains(custodian) {
            Ok(())
        } else {
            Err(SettlementError::UnknownCustodian {
                custodian: *custodian,
            })
        }
    }

    fn stake_of(&self, epoch: Epoch, custodian: &CustodianId, attester: &AttesterId) -> Stake {
        self.stakes
            .get(&(epoch, *custodian, *attester))
            .copied()
            .unwrap_or(0)
    }

    fn credit(&mut self, epoch: Epoch, custodian: CustodianId, attester: AttesterId, amount: Stake) {
        let entry = self.stakes.entry((epoch, custodian, attester)).or_insert(0);
        *entry = entry.saturating_add(amount);
        let total = self.totals.entry((epoch, custodian)).or_insert(0);
        *total = total.saturating_add(amount);
    }
}

pub struct InMemoryStakeLedger {
    clock: Arc<dyn Clock>,
    state: RwLock<LedgerState>,
}

impl InMemoryStakeLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Add an attester to the registry without stake. No-op if already present.
    pub fn register_attester(&self, attester: AttesterId) {
        let mut state = self.state.write();
        if !state.attesters.contains(&attester) {
            state.attesters.push(attester);
        }
    }

    /// Credit `amount` to `attester` through `custodian` at the current epoch.
    pub fn stake(
        &self,
        custodian: CustodianId,
        attester: AttesterId,
        amount: Stake,
    ) -> SettlementResult<()> {
        let mut state = self.state.write();
        state.ensure_custodian(&custodian)?;
        if !state.attesters.contains(&attester) {
            state.attesters.push(attester);
        }
        let epoch = state.current_epoch;
        state.credit(epoch, custodian, attester, amount);
        debug!(epoch, attester = %attester, amount, "[ledger] stake credited");
        Ok(())
    }

    /// Schedule `amount` to leave at the next rollover. The current epoch's
    /// balances are unaffected.
    pub fn unstake(
        &self,
        custodian: CustodianId,
        attester: AttesterId,
        amount: Stake,
    ) -> SettlementResult<()> {
        let mut state = self.state.write();
        state.ensure_custodian(&custodian)?;
        let epoch = state.current_epoch;
        let have = state.stake_of(epoch, &custodian, &attester);
        let pending = state
            .pending_unstakes
            .get(&(custodian, attester))
            .copied()
            .unwrap_or(0);
        let requested = pending.saturating_add(amount);
        if requested > have {
            return Err(SettlementError::InsufficientStake { have, requested });
        }
        state
            .pending_unstakes
            .insert((custodian, attester), requested);
        Ok(())
    }

    pub fn epoch_duration_secs(&self) -> SettlementResult<u64> {
        Ok(self.state.read().registration()?.epoch_duration_secs)
    }
}

impl StakeOracle for InMemoryStakeLedger {
    fn register_domain(&self, registration: &DomainRegistration) -> SettlementResult<()> {
        if registration.epoch_duration_secs == 0 {
            return Err(SettlementError::InvalidConfig {
                reason: "epoch duration must be greater than zero".into(),
            });
        }
        let epoch = self.clock.now_secs() / registration.epoch_duration_secs;
        let mut state = self.state.write();
        state.registration = Some(registration.clone());
        state.current_epoch = epoch;
        info!(
            epoch,
            custodians = registration.custodians.len(),
            "[ledger] domain registered"
        );
        Ok(())
    }

    fn stake_for_attester_at_epoch(
        &self,
        epoch: Epoch,
        custodian: &CustodianId,
        attester: &AttesterId,
    ) -> SettlementResult<Stake> {
        let state = self.state.read();
        state.ensure_custodian(custodian)?;
        Ok(state.stake_of(epoch, custodian, attester))
    }

    fn total_stake_for_epoch(
        &self,
        epoch: Epoch,
        custodian: &CustodianId,
    ) -> SettlementResult<Stake> {
        let state = self.state.read();
        state.ensure_custodian(custodian)?;
        Ok(state.totals.get(&(epoch, *custodian)).copied().unwrap_or(0))
    }

    fn custodians_for_domain(&self) -> SettlementResult<Vec<CustodianId>> {
        Ok(self.state.read().registration()?.custodians.clone())
    }

    fn attesters_for_domain(&self) -> SettlementResult<Vec<AttesterId>> {
        let state = self.state.read();
        state.registration()?;
        Ok(state.attesters.clone())
    }

    fn current_epoch(&self) -> SettlementResult<Epoch> {
        let state = self.state.read();
        state.registration()?;
        Ok(state.current_epoch)
    }

    fn current_epoch_by_time(&self) -> SettlementResult<Epoch> {
        let duration = self.state.read().registration()?.epoch_duration_secs;
        Ok(self.clock.now_secs() / duration)
    }

    /// Rolls `epoch` into `epoch + 1` when `epoch` is the current protocol
    /// epoch; any other value is a no-op.
    fn roll_over_epoch(&self, epoch: Epoch) -> SettlementResult<()> {
        let mut state = self.state.write();
        let custodians = state.registration()?.custodians.clone();
        if state.current_epoch != epoch {
            debug!(
                requested = epoch,
                current = state.current_epoch,
                "[ledger] rollover ignored, epoch already closed"
            );
            return Ok(());
        }

        let next = epoch
            .checked_add(1)
            .ok_or_else(|| SettlementError::EpochRolloverFailed {
                epoch,
                reason: "epoch counter exhausted".into(),
            })?;
        let attesters = state.attesters.clone();
        for custodian in &custodians {
            for attester in &attesters {
                let carried = state.stake_of(epoch, custodian, attester);
                let leaving = state
                    .pending_unstakes
                    .remove(&(*custodian, *attester))
                    .unwrap_or(0);
                let remaining = carried.saturating_sub(leaving);
                if remaining > 0 {
                    state.credit(next, *custodian, *attester, remaining);
                }
            }
        }
        state.current_epoch = next;
        debug!(from = epoch, to = next, "[ledger] epoch rolled over");
        Ok(())
    }
}

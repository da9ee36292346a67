//! Slashing Hook Adapters
//!
//! Neither adapter moves stake. `NoopSlashingHook` is the default strategy;
//! `MinorityRecorder` keeps the identified minority per height so an operator
//! (or a later penalty strategy) can act on it.

use crate::domain::slashing::{MinorityRecord, SlashingContext};
use crate::domain::BlockHeight;
use crate::error::SettlementResult;
use crate::ports::outbound::SlashingHook;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSlashingHook;

impl SlashingHook for NoopSlashingHook {
    fn slash_minority(&self, _context: &SlashingContext) -> SettlementResult<()> {
        Ok(())
    }
}

/// Records minority attesters per accepted height.
///
/// Recording the same height twice keeps the first record.
#[derive(Debug, Default)]
pub struct MinorityRecorder {
    records: RwLock<BTreeMap<BlockHeight, Vec<MinorityRecord>>>,
}

impl MinorityRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minority_at(&self, height: BlockHeight) -> Option<Vec<MinorityRecord>> {
        self.records.read().get(&height).cloned()
    }

    pub fn recorded_heights(&self) -> Vec<BlockHeight> {
        self.records.read().keys().copied().collect()
    }
}

impl SlashingHook for MinorityRecorder {
    fn slash_minority(&self, context: &SlashingContext) -> SettlementResult<()> {
        if context.is_unanimous() {
            return Ok(());
        }
        let height = context.accepted.height;
        debug!(
            height,
            epoch = context.epoch,
            minority = context.minority.len(),
            "[finality] minority identified"
        );
        self.records
            .write()
            .entry(height)
            .or_insert_with(|| context.minority.clone());
        Ok(())
    }
}

//! Genesis Gate Adapter
//!
//! The genesis ceremony check has no defined semantics yet. This gate keeps
//! the operation callable and always answers `NotYetImplemented`.

use crate::error::{SettlementError, SettlementResult};
use crate::ports::outbound::GenesisGate;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default)]
pub struct UnimplementedGenesisGate;

impl GenesisGate for UnimplementedGenesisGate {
    fn accept_genesis_ceremony(&self) -> SettlementResult<()> {
        warn!("[finality] genesis ceremony requested but no gate is installed");
        Err(SettlementError::NotYetImplemented {
            operation: "accept_genesis_ceremony".to_string(),
        })
    }
}

//! Settlement configuration
//!
//! Defaults can be overridden from environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SF_LEADING_BLOCK_TOLERANCE` | `leading_block_tolerance` |
//! | `SF_INITIAL_ACCEPTED_HEIGHT` | `initial_accepted_height` |
//! | `SF_EPOCH_DURATION_SECS` | `epoch_duration_secs` |
//! | `SF_EVENT_CHANNEL_CAPACITY` | `event_channel_capacity` |

use crate::domain::{BlockHeight, CustodianId, DomainId};
use crate::error::{SettlementError, SettlementResult};
use crate::ports::outbound::DomainRegistration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::warn;

/// Default broadcast capacity for outgoing events
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Domain this engine registers under
    pub domain: DomainId,
    /// Commitments must target heights below `frontier + tolerance`
    pub leading_block_tolerance: u64,
    /// Frontier at startup
    pub initial_accepted_height: BlockHeight,
    /// Length of a stake epoch in seconds
    pub epoch_duration_secs: u64,
    /// Custodians whose stake counts, each with unit weight
    pub custodians: Vec<CustodianId>,
    /// Capacity of the broadcast notifier channel
    pub event_channel_capacity: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            domain: DomainId::default(),
            leading_block_tolerance: 10,
            initial_accepted_height: 0,
            epoch_duration_secs: 3600,
            custodians: vec![CustodianId::default()],
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl SettlementConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("SF_LEADING_BLOCK_TOLERANCE", &mut config.leading_block_tolerance);
        override_from_env("SF_INITIAL_ACCEPTED_HEIGHT", &mut config.initial_accepted_height);
        override_from_env("SF_EPOCH_DURATION_SECS", &mut config.epoch_duration_secs);
        override_from_env("SF_EVENT_CHANNEL_CAPACITY", &mut config.event_channel_capacity);
        config
    }

    pub fn with_tolerance(mut self, leading_block_tolerance: u64) -> Self {
        self.leading_block_tolerance = leading_block_tolerance;
        self
    }

    pub fn with_initial_height(mut self, height: BlockHeight) -> Self {
        self.initial_accepted_height = height;
        self
    }

    pub fn with_custodians(mut self, custodians: Vec<CustodianId>) -> Self {
        self.custodians = custodians;
        self
    }

    pub fn with_epoch_duration(mut self, secs: u64) -> Self {
        self.epoch_duration_secs = secs;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn validate(&self) -> SettlementResult<()> {
        if self.epoch_duration_secs == 0 {
            return Err(SettlementError::InvalidConfig {
                reason: "epoch_duration_secs must be greater than zero".into(),
            });
        }
        if self.initial_accepted_height == BlockHeight::MAX {
            return Err(SettlementError::InvalidConfig {
                reason: "initial_accepted_height leaves no height to accept".into(),
            });
        }
        if self.custodians.is_empty() {
            return Err(SettlementError::InvalidConfig {
                reason: "at least one custodian is required".into(),
            });
        }
        let unique: HashSet<_> = self.custodians.iter().collect();
        if unique.len() != self.custodians.len() {
            return Err(SettlementError::InvalidConfig {
                reason: "custodians must be unique".into(),
            });
        }
        if self.event_channel_capacity == 0 {
            return Err(SettlementError::InvalidConfig {
                reason: "event_channel_capacity must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn registration(&self) -> DomainRegistration {
        DomainRegistration {
            domain: self.domain,
            epoch_duration_secs: self.epoch_duration_secs,
            custodians: self.custodians.clone(),
        }
    }
}

fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => warn!(key, value = %raw, "ignoring unparsable configuration override"),
        }
    }
}

//! # Minority identification
//!
//! When a height is accepted, every registered attester falls in one of three
//! groups: it committed the accepted hash, it committed a different hash, or
//! it never committed. The last two are the candidates a penalty strategy
//! acts on. This module only identifies them; it never touches stake.

use super::commitment::{AttesterId, BlockCommitment, Epoch, Hash};
use super::store::ConsensusState;

/// Why an attester is outside the accepted majority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinorityOffense {
    /// Committed a hash other than the accepted one
    Deviated { commitment_hash: Hash },
    /// No commitment at the accepted height
    Absent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinorityRecord {
    pub attester: AttesterId,
    pub offense: MinorityOffense,
}

/// Everything a slashing strategy gets to see about one acceptance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashingContext {
    pub accepted: BlockCommitment,
    pub epoch: Epoch,
    pub minority: Vec<MinorityRecord>,
}

impl SlashingContext {
    /// Classify `attesters` against the accepted commitment at its height.
    pub fn build(
        accepted: BlockCommitment,
        epoch: Epoch,
        attesters: &[AttesterId],
        state: &ConsensusState,
    ) -> Self {
        let minority = attesters
            .iter()
            .filter_map(|attester| {
                let offense = match state.commitment(accepted.height, attester) {
                    Some(c) if c.commitment_hash == accepted.commitment_hash => return None,
                    Some(c) => MinorityOffense::Deviated {
                        commitment_hash: c.commitment_hash,
                    },
                    None => MinorityOffense::Absent,
                };
                Some(MinorityRecord {
                    attester: *attester,
                    offense,
                })
            })
            .collect();

        Self {
            accepted,
            epoch,
            minority,
        }
    }

    pub fn is_unanimous(&self) -> bool {
        self.minority.is_empty()
    }

    pub fn deviated(&self) -> impl Iterator<Item = &MinorityRecord> {
        self.minority
            .iter()
            .filter(|r| matches!(r.offense, MinorityOffense::Deviated { .. }))
    }

    pub fn absent(&self) -> impl Iterator<Item = &MinorityRecord> {
        self.minority
            .iter()
            .filter(|r| r.offense == MinorityOffense::Absent)
    }
}

//! Commitment entities
//!
//! A commitment is an attester's claim about the settled state digest and the
//! block identifier at one block height.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

/// Block height. Height 0 is reserved and never carries a commitment.
pub type BlockHeight = u64;

/// Epoch number as reported by the stake oracle.
pub type Epoch = u64;

/// Stake amount.
pub type Stake = u128;

/// 32-byte digest (commitment hash, block id).
pub type Hash = [u8; 32];

/// Attester identifier (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttesterId(pub [u8; 32]);

impl AttesterId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for AttesterId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for AttesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttesterId({})", short_hex(&self.0))
    }
}

impl fmt::Display for AttesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_hex(&self.0))
    }
}

/// Custodian identifier: the address of a stake-accounting unit (e.g. a token).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CustodianId(pub [u8; 20]);

impl From<[u8; 20]> for CustodianId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// Domain identifier under which this engine is registered with the stake oracle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainId(pub [u8; 20]);

/// A commitment to the state of one block.
///
/// Immutable once stored: the store hands out copies, never mutable references.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockCommitment {
    pub height: BlockHeight,
    #[serde_as(as = "Bytes")]
    pub commitment_hash: Hash,
    #[serde_as(as = "Bytes")]
    pub block_id: Hash,
}

impl BlockCommitment {
    pub fn new(height: BlockHeight, commitment_hash: Hash, block_id: Hash) -> Self {
        Self {
            height,
            commitment_hash,
            block_id,
        }
    }
}

/// A commitment together with the attester submitting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCommitment {
    pub attester: AttesterId,
    pub commitment: BlockCommitment,
}

impl SignedCommitment {
    pub fn new(attester: AttesterId, commitment: BlockCommitment) -> Self {
        Self {
            attester,
            commitment,
        }
    }
}

/// Logical state of a height in the acceptance engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum HeightState {
    /// No commitment has cleared the supermajority bar yet
    #[default]
    Pending,
    /// A commitment was finalized for this height (terminal)
    Accepted,
}

pub(crate) fn short_hex(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}

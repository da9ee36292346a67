//! Incoming events for commitment finality

use crate::domain::{AttesterId, BlockCommitment, SignedCommitment};
use serde::{Deserialize, Serialize};

/// Ordered commitments applied one after another.
///
/// Processing stops at the first failing item; items before it stay applied.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CommitmentBatch {
    pub commitments: Vec<SignedCommitment>,
}

impl CommitmentBatch {
    pub fn new(commitments: Vec<SignedCommitment>) -> Self {
        Self { commitments }
    }

    /// Batch of commitments all signed by one attester.
    pub fn from_attester(attester: AttesterId, commitments: Vec<BlockCommitment>) -> Self {
        Self {
            commitments: commitments
                .into_iter()
                .map(|c| SignedCommitment::new(attester, c))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commitments.len()
    }
}

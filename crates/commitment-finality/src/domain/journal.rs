//! Undo journal for a single submission
//!
//! Every mutation of [`ConsensusState`](super::store::ConsensusState) made
//! while processing one submission is recorded here. If any later step of the
//! same submission fails (typically a stake oracle call inside the cascade),
//! the journal is replayed backwards and the state is restored exactly.

use super::commitment::{AttesterId, BlockHeight, Hash, Stake};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum JournalEntry {
    EpochBound {
        height: BlockHeight,
    },
    CommitmentStored {
        height: BlockHeight,
        attester: AttesterId,
    },
    StakeAdded {
        height: BlockHeight,
        commitment_hash: Hash,
        previous: Option<Stake>,
    },
    BlockAccepted {
        height: BlockHeight,
        previous_frontier: BlockHeight,
    },
}

/// Ordered record of mutations applied during one submission.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Entries in undo order (most recent first).
    pub(crate) fn drain_reversed(&mut self) -> impl Iterator<Item = JournalEntry> + '_ {
        self.entries.drain(..).rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

use serde::{Deserialize, Serialize};

use super::{Address, Age};

/// Candidate IDs are positions in the append-only candidate sequence.
pub type CandidateId = u64;

/// Vote tallies.
pub type VoteCount = u64;

/// A live candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub address: Address,
    pub name: String,
    pub age: Age,
    pub vote_count: VoteCount,
}

impl Candidate {
    /// Create a candidate with zero votes.
    pub fn new(id: CandidateId, address: Address, name: String, age: Age) -> Self {
        Self {
            id,
            address,
            name,
            age,
            vote_count: 0,
        }
    }
}

/// One position in the candidate sequence.
///
/// Removed candidates leave a tombstone behind so that IDs stay stable.
/// Tombstones are never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "candidate", rename_all = "camelCase")]
pub enum CandidateSlot {
    Live(Candidate),
    Tombstoned,
}

impl CandidateSlot {
    /// The candidate in this slot, unless it has been removed.
    pub fn live(&self) -> Option<&Candidate> {
        match self {
            Self::Live(candidate) => Some(candidate),
            Self::Tombstoned => None,
        }
    }

    pub fn live_mut(&mut self) -> Option<&mut Candidate> {
        match self {
            Self::Live(candidate) => Some(candidate),
            Self::Tombstoned => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

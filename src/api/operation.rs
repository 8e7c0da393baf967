use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::model::{Address, Age, CandidateId, Winner};

/// One call against the registry, as submitted by an external caller.
///
/// `caller` is whatever identity the external identity source vouched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    RegisterVoter {
        caller: Address,
        address: Address,
        name: String,
        age: Age,
    },
    RegisterCandidate {
        caller: Address,
        address: Address,
        name: String,
        age: Age,
    },
    Vote {
        caller: Address,
        candidate: CandidateId,
    },
    RemoveCandidate {
        caller: Address,
        candidate: CandidateId,
    },
    Winner,
}

impl Operation {
    /// Whether a successful call changes registry state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Winner)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegisterVoter {
                caller, address, ..
            } => write!(f, "register_voter {address} by {caller}"),
            Self::RegisterCandidate {
                caller, address, ..
            } => write!(f, "register_candidate {address} by {caller}"),
            Self::Vote { caller, candidate } => write!(f, "vote {candidate} by {caller}"),
            Self::RemoveCandidate { caller, candidate } => {
                write!(f, "remove_candidate {candidate} by {caller}")
            }
            Self::Winner => write!(f, "winner"),
        }
    }
}

/// The result of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Done,
    CandidateRegistered { id: CandidateId },
    Winner(Winner),
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::CandidateRegistered { id } => write!(f, "registered as candidate {id}"),
            Self::Winner(winner) => write!(f, "winner: {winner}"),
        }
    }
}

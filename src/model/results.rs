use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::{Address, Candidate, VoteCount};

/// The outcome of a winner query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub address: Address,
    pub name: String,
    pub votes: VoteCount,
}

impl From<&Candidate> for Winner {
    fn from(candidate: &Candidate) -> Self {
        Self {
            address: candidate.address.clone(),
            name: candidate.name.clone(),
            votes: candidate.vote_count,
        }
    }
}

impl Display for Winner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) with {} vote{}",
            self.name,
            self.address,
            self.votes,
            if self.votes != 1 { "s" } else { "" }
        )
    }
}

use serde::{Deserialize, Serialize};

use super::{Address, Age};

/// A registered voter, keyed by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    pub address: Address,
    pub name: String,
    pub age: Age,
    /// Only ever goes from false to true, when the voter's single vote is accepted.
    pub has_voted: bool,
}

impl Voter {
    /// Create a voter who has not voted yet.
    pub fn new(address: Address, name: String, age: Age) -> Self {
        Self {
            address,
            name,
            age,
            has_voted: false,
        }
    }
}

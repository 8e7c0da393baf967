pub use address::{Address, InvalidAddress};
pub use candidate::{Candidate, CandidateId, CandidateSlot, VoteCount};
pub use commission::{Commission, RegistryId};
pub use registry::{Inconsistency, Registry, RegistryError};
pub use results::Winner;
pub use snapshot::Snapshot;
pub use voter::Voter;

mod address;
mod candidate;
mod commission;
mod registry;
mod results;
mod snapshot;
mod voter;

/// Ages are whole years.
pub type Age = u32;

/// Voters and candidates must be at least this old when registered.
pub const ADMISSION_AGE: Age = 18;

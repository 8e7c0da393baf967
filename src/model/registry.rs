use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    Address, Age, Candidate, CandidateId, CandidateSlot, Commission, RegistryId, Voter, Winner,
    ADMISSION_AGE,
};

/// Ways in which a registry call can be rejected.
///
/// A rejected call leaves the registry exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unauthorized: {0} is not the election commission")]
    Unauthorized(Address),
    #[error("Invalid age: {0} is below the admission age of {}", ADMISSION_AGE)]
    InvalidAge(Age),
    #[error("Voter {0} is already registered")]
    DuplicateVoter(Address),
    #[error("Candidate {0} is already registered")]
    DuplicateCandidate(Address),
    #[error("{0} is not a registered voter")]
    VoterNotRegistered(Address),
    #[error("Voter {0} has already voted")]
    AlreadyVoted(Address),
    #[error("Invalid candidate ID {0}")]
    InvalidCandidate(CandidateId),
    #[error("Candidate {0} does not exist")]
    CandidateNotFound(CandidateId),
    #[error("No candidates are standing")]
    NoCandidates,
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// A broken structural invariant in registry state that came from outside.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Inconsistency {
    #[error("candidate in slot {slot} claims ID {claimed}")]
    MisplacedCandidate { slot: usize, claimed: CandidateId },
    #[error("candidate address {0} appears in more than one live slot")]
    SharedCandidateAddress(Address),
    #[error("voter {voter} is stored under address {key}")]
    MisfiledVoter { key: Address, voter: Address },
}

/// The authoritative election state: voters, candidate slots, and the
/// identity of the election commission.
///
/// Every mutating method performs all of its checks before touching any
/// state, so a failed call never leaves a partial update behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    id: RegistryId,
    commission: Address,
    voters: BTreeMap<Address, Voter>,
    candidates: Vec<CandidateSlot>,
}

impl Registry {
    /// Create a new, empty registry whose commission is `initiator`.
    ///
    /// The returned [`Commission`] is the capability needed for every
    /// privileged operation on this registry.
    pub fn create(initiator: Address) -> (Self, Commission) {
        let id = RegistryId::random();
        info!("Created registry {id} with commission {initiator}");
        let commission = Commission::issue(id, initiator.clone());
        let registry = Self {
            id,
            commission: initiator,
            voters: BTreeMap::new(),
            candidates: Vec::new(),
        };
        (registry, commission)
    }

    /// Exchange an authenticated caller identity for a commission token.
    pub fn authorize(&self, caller: &Address) -> Result<Commission> {
        if caller != &self.commission {
            return Err(RegistryError::Unauthorized(caller.clone()));
        }
        Ok(Commission::issue(self.id, caller.clone()))
    }

    /// Register a new voter.
    ///
    /// Checks, in order: the token, the age, then uniqueness of the address.
    pub fn register_voter(
        &mut self,
        commission: &Commission,
        address: Address,
        name: String,
        age: Age,
    ) -> Result<()> {
        self.check_commission(commission)?;
        check_age(age)?;
        if self.voters.contains_key(&address) {
            return Err(RegistryError::DuplicateVoter(address));
        }

        debug!("Registering voter {address}");
        let voter = Voter::new(address.clone(), name, age);
        self.voters.insert(address, voter);
        Ok(())
    }

    /// Register a new candidate, returning its ID.
    ///
    /// Checks, in order: the token, the age, then uniqueness of the address
    /// among live candidates. The new candidate is always appended; the IDs of
    /// removed candidates are never reused.
    pub fn register_candidate(
        &mut self,
        commission: &Commission,
        address: Address,
        name: String,
        age: Age,
    ) -> Result<CandidateId> {
        self.check_commission(commission)?;
        check_age(age)?;
        if self.live_candidates().any(|c| c.address == address) {
            return Err(RegistryError::DuplicateCandidate(address));
        }

        let id = self.candidate_count();
        debug!("Registering candidate {address} as ID {id}");
        self.candidates
            .push(CandidateSlot::Live(Candidate::new(id, address, name, age)));
        Ok(id)
    }

    /// Cast `caller`'s single vote for the given candidate.
    ///
    /// Checks, in order: that the caller is registered, that they have not
    /// voted, then that the candidate is live.
    pub fn vote(&mut self, caller: &Address, candidate_id: CandidateId) -> Result<()> {
        let voter = self
            .voters
            .get_mut(caller)
            .ok_or_else(|| RegistryError::VoterNotRegistered(caller.clone()))?;
        if voter.has_voted {
            return Err(RegistryError::AlreadyVoted(caller.clone()));
        }
        let candidate = slot_index(candidate_id)
            .and_then(|index| self.candidates.get_mut(index))
            .and_then(CandidateSlot::live_mut)
            .ok_or(RegistryError::InvalidCandidate(candidate_id))?;

        // All checks passed; apply both halves together.
        candidate.vote_count += 1;
        voter.has_voted = true;
        debug!("Voter {caller} voted for candidate {candidate_id}");
        Ok(())
    }

    /// Remove a live candidate, leaving a tombstone in its slot.
    ///
    /// Votes already cast for the candidate are not returned to their voters.
    pub fn remove_candidate(
        &mut self,
        commission: &Commission,
        candidate_id: CandidateId,
    ) -> Result<()> {
        self.check_commission(commission)?;
        let slot = slot_index(candidate_id)
            .and_then(|index| self.candidates.get_mut(index))
            .filter(|slot| slot.is_live())
            .ok_or(RegistryError::CandidateNotFound(candidate_id))?;

        *slot = CandidateSlot::Tombstoned;
        debug!("Removed candidate {candidate_id}");
        Ok(())
    }

    /// The live candidate with the most votes.
    ///
    /// Ties go to the lowest ID, i.e. the earliest registration still standing.
    pub fn winner(&self) -> Result<Winner> {
        let mut best: Option<&Candidate> = None;
        for candidate in self.live_candidates() {
            // Strictly greater, so the first of several equal tallies is kept.
            if best.map_or(true, |b| candidate.vote_count > b.vote_count) {
                best = Some(candidate);
            }
        }
        best.map(Winner::from).ok_or(RegistryError::NoCandidates)
    }

    /// Live candidates ordered by votes (descending), then ID (ascending).
    pub fn standings(&self) -> Vec<&Candidate> {
        let mut standings = self.live_candidates().collect::<Vec<_>>();
        // Stable sort over ID order keeps lower IDs first among equals.
        standings.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
        standings
    }

    pub fn id(&self) -> RegistryId {
        self.id
    }

    pub fn commission(&self) -> &Address {
        &self.commission
    }

    pub fn voter(&self, address: &Address) -> Option<&Voter> {
        self.voters.get(address)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    /// How many registered voters have voted.
    pub fn votes_cast(&self) -> usize {
        self.voters.values().filter(|v| v.has_voted).count()
    }

    /// The slot for an ID: `None` if the ID was never assigned.
    pub fn candidate(&self, candidate_id: CandidateId) -> Option<&CandidateSlot> {
        slot_index(candidate_id).and_then(|index| self.candidates.get(index))
    }

    /// The number of IDs ever assigned, including removed candidates.
    pub fn candidate_count(&self) -> CandidateId {
        self.candidates.len() as CandidateId
    }

    /// Live candidates in ID order.
    pub fn live_candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter_map(CandidateSlot::live)
    }

    /// Check the structural invariants that the mutating methods maintain.
    /// Used when state comes from outside, e.g. a snapshot.
    pub fn validate(&self) -> std::result::Result<(), Inconsistency> {
        let mut seen = HashSet::new();
        for (slot, candidate) in self
            .candidates
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.live().map(|c| (i, c)))
        {
            if candidate.id != slot as CandidateId {
                return Err(Inconsistency::MisplacedCandidate {
                    slot,
                    claimed: candidate.id,
                });
            }
            if !seen.insert(&candidate.address) {
                return Err(Inconsistency::SharedCandidateAddress(
                    candidate.address.clone(),
                ));
            }
        }
        for (key, voter) in &self.voters {
            if key != &voter.address {
                return Err(Inconsistency::MisfiledVoter {
                    key: key.clone(),
                    voter: voter.address.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_commission(&self, commission: &Commission) -> Result<()> {
        if commission.registry() != self.id || commission.address() != &self.commission {
            warn!(
                "Rejected commission token for registry {} (this is {})",
                commission.registry(),
                self.id
            );
            return Err(RegistryError::Unauthorized(commission.address().clone()));
        }
        Ok(())
    }
}

fn check_age(age: Age) -> Result<()> {
    if age < ADMISSION_AGE {
        return Err(RegistryError::InvalidAge(age));
    }
    Ok(())
}

fn slot_index(candidate_id: CandidateId) -> Option<usize> {
    usize::try_from(candidate_id).ok()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[registry_test]
    fn create_sets_commission(registry: Registry, commission: Commission) {
        assert_eq!(registry.commission(), &Address::example_commission());
        assert_eq!(commission.address(), registry.commission());
        assert_eq!(commission.registry(), registry.id());
        assert_eq!(registry.candidate_count(), 0);
        assert_eq!(registry.voter_count(), 0);
    }

    #[registry_test]
    fn authorize(registry: Registry) {
        let token = registry.authorize(&Address::example_commission()).unwrap();
        assert_eq!(token.registry(), registry.id());

        let outsider = Address::example_voter1();
        assert_eq!(
            registry.authorize(&outsider),
            Err(RegistryError::Unauthorized(outsider))
        );
    }

    #[registry_test]
    fn register_voter(mut registry: Registry, commission: Commission) {
        let alice = Voter::example1();
        registry
            .register_voter(&commission, alice.address.clone(), "Alice".into(), 25)
            .unwrap();

        let stored = registry.voter(&alice.address).unwrap();
        assert_eq!(stored, &alice);
        assert!(!stored.has_voted);
        assert_eq!(registry.voter_count(), 1);
    }

    #[registry_test]
    fn foreign_token_is_unauthorized(mut registry: Registry) {
        // Same address, different registry instance.
        let (_, foreign) = Registry::create(Address::example_commission());
        let before = registry.clone();

        assert_eq!(
            registry.register_voter(&foreign, Address::example_voter1(), "Alice".into(), 25),
            Err(RegistryError::Unauthorized(Address::example_commission()))
        );
        assert_eq!(
            registry.register_candidate(
                &foreign,
                Address::example_candidate1(),
                "John".into(),
                30
            ),
            Err(RegistryError::Unauthorized(Address::example_commission()))
        );
        assert_eq!(registry, before);
    }

    #[registry_test(seeded)]
    fn foreign_token_cannot_remove(mut registry: Registry) {
        let (_, foreign) = Registry::create(Address::example_voter1());
        assert_eq!(
            registry.remove_candidate(&foreign, 0),
            Err(RegistryError::Unauthorized(Address::example_voter1()))
        );
        assert!(registry.candidate(0).unwrap().is_live());
    }

    #[registry_test]
    fn duplicate_voter(mut registry: Registry, commission: Commission) {
        let address = Address::example_voter1();
        registry
            .register_voter(&commission, address.clone(), "Alice".into(), 25)
            .unwrap();
        let before = registry.voter(&address).cloned();

        assert_eq!(
            registry.register_voter(&commission, address.clone(), "Mallory".into(), 99),
            Err(RegistryError::DuplicateVoter(address.clone()))
        );
        assert_eq!(registry.voter(&address).cloned(), before);
    }

    #[registry_test]
    fn underage_registrations(mut registry: Registry, commission: Commission) {
        for age in [0, 1, 17] {
            let voter = Address::random();
            assert_eq!(
                registry.register_voter(&commission, voter.clone(), "Kid".into(), age),
                Err(RegistryError::InvalidAge(age))
            );
            assert!(registry.voter(&voter).is_none());

            assert_eq!(
                registry.register_candidate(&commission, Address::random(), "Kid".into(), age),
                Err(RegistryError::InvalidAge(age))
            );
        }
        assert_eq!(registry.voter_count(), 0);
        assert_eq!(registry.candidate_count(), 0);

        registry
            .register_voter(&commission, Address::random(), "Adult".into(), 18)
            .unwrap();
        registry
            .register_candidate(&commission, Address::random(), "Adult".into(), 18)
            .unwrap();
    }

    #[registry_test]
    fn age_checked_before_duplicate(mut registry: Registry, commission: Commission) {
        let address = Address::example_voter1();
        registry
            .register_voter(&commission, address.clone(), "Alice".into(), 25)
            .unwrap();
        assert_eq!(
            registry.register_voter(&commission, address, "Alice".into(), 17),
            Err(RegistryError::InvalidAge(17))
        );
    }

    #[registry_test(seeded)]
    fn commission_checked_first(mut registry: Registry) {
        let (_, foreign) = Registry::create(Address::example_voter1());
        let before = registry.clone();
        let unauthorized = Err(RegistryError::Unauthorized(Address::example_voter1()));

        // Underage and already registered, but the token fails first.
        assert_eq!(
            registry.register_voter(&foreign, Address::example_voter2(), "Bob".into(), 12),
            unauthorized
        );
        assert_eq!(
            registry
                .register_candidate(&foreign, Address::example_candidate1(), "John".into(), 12)
                .map(|_| ()),
            unauthorized
        );
        // No such candidate either.
        assert_eq!(registry.remove_candidate(&foreign, 99), unauthorized);
        assert_eq!(registry, before);
    }

    #[registry_test]
    fn register_candidate(mut registry: Registry, commission: Commission) {
        let id = registry
            .register_candidate(&commission, Address::example_candidate1(), "John".into(), 30)
            .unwrap();
        assert_eq!(id, 0);

        let candidate = registry.candidate(0).and_then(CandidateSlot::live).unwrap();
        assert_eq!(candidate.address, Address::example_candidate1());
        assert_eq!(candidate.name, "John");
        assert_eq!(candidate.age, 30);
        assert_eq!(candidate.vote_count, 0);
        assert_eq!(registry.candidate_count(), 1);
        assert!(registry.candidate(1).is_none());
    }

    #[registry_test]
    fn duplicate_candidate(mut registry: Registry, commission: Commission) {
        let address = Address::example_candidate1();
        registry
            .register_candidate(&commission, address.clone(), "John".into(), 30)
            .unwrap();
        assert_eq!(
            registry.register_candidate(&commission, address.clone(), "John".into(), 30),
            Err(RegistryError::DuplicateCandidate(address))
        );
        assert_eq!(registry.candidate_count(), 1);
    }

    #[registry_test(seeded)]
    fn vote(mut registry: Registry) {
        let alice = Address::example_voter1();
        registry.vote(&alice, 0).unwrap();

        assert_eq!(registry.candidate(0).unwrap().live().unwrap().vote_count, 1);
        assert!(registry.voter(&alice).unwrap().has_voted);
        assert_eq!(registry.votes_cast(), 1);
    }

    #[registry_test(seeded)]
    fn vote_twice(mut registry: Registry) {
        let alice = Address::example_voter1();
        registry.vote(&alice, 0).unwrap();

        // Neither the same nor a different candidate.
        for id in [0, 1] {
            assert_eq!(
                registry.vote(&alice, id),
                Err(RegistryError::AlreadyVoted(alice.clone()))
            );
        }
        assert_eq!(registry.candidate(0).unwrap().live().unwrap().vote_count, 1);
        assert_eq!(registry.candidate(1).unwrap().live().unwrap().vote_count, 0);
    }

    #[registry_test(seeded)]
    fn unregistered_voter(mut registry: Registry) {
        let stranger = Address::random();
        assert_eq!(
            registry.vote(&stranger, 0),
            Err(RegistryError::VoterNotRegistered(stranger.clone()))
        );
        assert_eq!(registry.candidate(0).unwrap().live().unwrap().vote_count, 0);

        // Registration is checked before the candidate.
        assert_eq!(
            registry.vote(&stranger, 99),
            Err(RegistryError::VoterNotRegistered(stranger))
        );
    }

    #[registry_test(seeded)]
    fn vote_for_invalid_candidate(mut registry: Registry, commission: Commission) {
        let alice = Address::example_voter1();
        let before = registry.clone();

        for id in [2, 1000, u64::MAX] {
            assert_eq!(
                registry.vote(&alice, id),
                Err(RegistryError::InvalidCandidate(id))
            );
        }
        assert_eq!(registry, before);

        registry.remove_candidate(&commission, 1).unwrap();
        assert_eq!(
            registry.vote(&alice, 1),
            Err(RegistryError::InvalidCandidate(1))
        );
        assert!(!registry.voter(&alice).unwrap().has_voted);

        // Having voted is checked before the candidate.
        registry.vote(&alice, 0).unwrap();
        for id in [1, 99] {
            assert_eq!(
                registry.vote(&alice, id),
                Err(RegistryError::AlreadyVoted(alice.clone()))
            );
        }
    }

    #[registry_test(seeded)]
    fn remove_candidate(mut registry: Registry, commission: Commission) {
        registry.remove_candidate(&commission, 0).unwrap();
        assert_eq!(registry.candidate(0), Some(&CandidateSlot::Tombstoned));
        assert_eq!(registry.candidate_count(), 2);
        assert_eq!(registry.live_candidates().count(), 1);

        assert_eq!(
            registry.remove_candidate(&commission, 0),
            Err(RegistryError::CandidateNotFound(0))
        );
        assert_eq!(
            registry.remove_candidate(&commission, 7),
            Err(RegistryError::CandidateNotFound(7))
        );
    }

    #[registry_test(seeded)]
    fn ids_never_reused(mut registry: Registry, commission: Commission) {
        registry.remove_candidate(&commission, 1).unwrap();

        // The removed address may stand again, but gets a fresh ID.
        let id = registry
            .register_candidate(&commission, Address::example_candidate2(), "Doe".into(), 40)
            .unwrap();
        assert_eq!(id, 2);
        assert_eq!(registry.candidate(1), Some(&CandidateSlot::Tombstoned));
        assert_eq!(registry.candidate_count(), 3);
    }

    #[registry_test(seeded)]
    fn winner_tie_goes_to_lowest_id(mut registry: Registry) {
        // Both on zero.
        let winner = registry.winner().unwrap();
        assert_eq!(winner.name, "John");
        assert_eq!(winner.votes, 0);

        // Both on one.
        registry.vote(&Address::example_voter1(), 0).unwrap();
        registry.vote(&Address::example_voter2(), 1).unwrap();
        let winner = registry.winner().unwrap();
        assert_eq!(winner.address, Address::example_candidate1());
        assert_eq!(winner.name, "John");
        assert_eq!(winner.votes, 1);
    }

    #[registry_test(seeded)]
    fn winner_follows_tally(mut registry: Registry, commission: Commission) {
        let carol = Address::random();
        registry
            .register_voter(&commission, carol.clone(), "Carol".into(), 33)
            .unwrap();
        registry.vote(&Address::example_voter1(), 1).unwrap();
        registry.vote(&carol, 1).unwrap();
        registry.vote(&Address::example_voter2(), 0).unwrap();

        let winner = registry.winner().unwrap();
        assert_eq!(winner.name, "Doe");
        assert_eq!(winner.votes, 2);
    }

    #[registry_test(seeded)]
    fn removed_leader_cannot_win(mut registry: Registry, commission: Commission) {
        registry.vote(&Address::example_voter1(), 0).unwrap();
        registry.remove_candidate(&commission, 0).unwrap();

        let winner = registry.winner().unwrap();
        assert_eq!(winner.address, Address::example_candidate2());
        assert_eq!(winner.name, "Doe");
        assert_eq!(winner.votes, 0);
        assert_eq!(registry.candidate(0), Some(&CandidateSlot::Tombstoned));
    }

    #[registry_test]
    fn winner_without_candidates(mut registry: Registry, commission: Commission) {
        assert_eq!(registry.winner(), Err(RegistryError::NoCandidates));

        registry
            .register_candidate(&commission, Address::example_candidate1(), "John".into(), 30)
            .unwrap();
        registry.remove_candidate(&commission, 0).unwrap();
        assert_eq!(registry.winner(), Err(RegistryError::NoCandidates));
    }

    #[registry_test(seeded)]
    fn standings_agree_with_winner(mut registry: Registry, commission: Commission) {
        let carol = Address::random();
        let id = registry
            .register_candidate(&commission, carol, "Carol".into(), 50)
            .unwrap();
        registry.vote(&Address::example_voter1(), id).unwrap();
        registry.vote(&Address::example_voter2(), 1).unwrap();

        let names = registry
            .standings()
            .into_iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["Doe", "Carol", "John"]);
        assert_eq!(registry.winner().unwrap().name, names[0]);
    }

    #[registry_test(seeded)]
    fn validate_detects_corruption(mut registry: Registry) {
        assert_eq!(registry.validate(), Ok(()));

        let john = registry.candidates[0].clone();
        registry.candidates.push(john);
        assert_eq!(
            registry.validate(),
            Err(Inconsistency::MisplacedCandidate {
                slot: 2,
                claimed: 0
            })
        );

        if let CandidateSlot::Live(candidate) = &mut registry.candidates[2] {
            candidate.id = 2;
        }
        assert_eq!(
            registry.validate(),
            Err(Inconsistency::SharedCandidateAddress(
                Address::example_candidate1()
            ))
        );
    }
}

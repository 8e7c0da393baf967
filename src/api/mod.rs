use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::Config;
use crate::error::Result;
use crate::logging::{log_call, log_return};
use crate::model::{Registry, Snapshot};

pub use operation::{Operation, Outcome};

mod operation;

/// A handle to the single authoritative registry, shareable between threads.
///
/// Every call holds one lock for its whole duration, so calls are applied
/// one at a time in the order they acquire it, and no caller ever sees a
/// half-applied call. When a snapshot path is set, every successful mutation
/// is persisted before the lock is released; if persisting fails, the
/// mutation is rolled back.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
    snapshot_path: Option<PathBuf>,
}

impl SharedRegistry {
    /// Share an in-memory registry, without persistence.
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
            snapshot_path: None,
        }
    }

    /// Share a registry that is persisted to `path` after every mutation.
    pub fn persisted(registry: Registry, path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
            snapshot_path: Some(path.into()),
        }
    }

    /// Open the registry described by the configuration.
    ///
    /// If a snapshot path is configured and a snapshot exists there, it is
    /// loaded; otherwise a new registry is created with the configured
    /// commission.
    pub fn open(config: &Config) -> Result<Self> {
        let Some(path) = config.snapshot_path() else {
            let (registry, _) = Registry::create(config.commission().clone());
            return Ok(Self::new(registry));
        };

        if !path.exists() {
            info!("No snapshot at {}, creating a new registry", path.display());
            let (registry, _) = Registry::create(config.commission().clone());
            Snapshot::of(&registry).save(path)?;
            return Ok(Self::persisted(registry, path));
        }

        let snapshot = Snapshot::load(path)?;
        if snapshot.registry.commission() != config.commission() {
            warn!(
                "Configured commission {} differs from the persisted commission {}; keeping the persisted one",
                config.commission(),
                snapshot.registry.commission()
            );
        }
        info!(
            "Opened registry {} from {}",
            snapshot.registry.id(),
            path.display()
        );
        Ok(Self::persisted(snapshot.registry, path))
    }

    /// Apply one call.
    pub fn apply(&self, operation: Operation) -> Result<Outcome> {
        let id = log_call(&operation);
        let mut registry = self.lock();

        let result = match (&self.snapshot_path, operation.is_mutation()) {
            (Some(path), true) => {
                let before = registry.clone();
                dispatch(&mut registry, operation).and_then(|outcome| {
                    if let Err(err) = Snapshot::of(&registry).save(path) {
                        *registry = before;
                        return Err(err);
                    }
                    Ok(outcome)
                })
            }
            _ => dispatch(&mut registry, operation),
        };

        log_return(id, &result);
        result
    }

    /// Run a read-only query against the current state.
    pub fn read<T>(&self, query: impl FnOnce(&Registry) -> T) -> T {
        query(&*self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // Registry methods never panic part-way through a mutation, so the
        // state behind a poisoned lock is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Route one call to the registry, authorising the caller where required.
fn dispatch(registry: &mut Registry, operation: Operation) -> Result<Outcome> {
    let outcome = match operation {
        Operation::RegisterVoter {
            caller,
            address,
            name,
            age,
        } => {
            let commission = registry.authorize(&caller)?;
            registry.register_voter(&commission, address, name, age)?;
            Outcome::Done
        }
        Operation::RegisterCandidate {
            caller,
            address,
            name,
            age,
        } => {
            let commission = registry.authorize(&caller)?;
            let id = registry.register_candidate(&commission, address, name, age)?;
            Outcome::CandidateRegistered { id }
        }
        Operation::Vote { caller, candidate } => {
            registry.vote(&caller, candidate)?;
            Outcome::Done
        }
        Operation::RemoveCandidate { caller, candidate } => {
            let commission = registry.authorize(&caller)?;
            registry.remove_candidate(&commission, candidate)?;
            Outcome::Done
        }
        Operation::Winner => Outcome::Winner(registry.winner()?),
    };
    Ok(outcome)
}

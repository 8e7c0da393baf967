use thiserror::Error;

use crate::model::{Inconsistency, InvalidAddress, RegistryError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Address(#[from] InvalidAddress),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
    #[error("Failed to initialise logging from {0}")]
    Logging(String),
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(#[from] Inconsistency),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl Error {
    /// Whether the registry rejected the call, as opposed to the environment failing.
    pub fn is_rejection(&self) -> bool {
        self.rejection().is_some()
    }

    /// The reason the registry rejected the call, if it did.
    pub fn rejection(&self) -> Option<&RegistryError> {
        match self {
            Self::Registry(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::Address;

    #[test]
    fn rejection() {
        let err = Error::from(RegistryError::AlreadyVoted(Address::example_voter1()));
        assert!(err.is_rejection());
        assert_eq!(
            err.rejection(),
            Some(&RegistryError::AlreadyVoted(Address::example_voter1()))
        );

        let err = Error::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(!err.is_rejection());
        assert_eq!(err.rejection(), None);
    }
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::Address;

/// Random identity of one registry instance, drawn when it is created.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryId(pub u64);

impl RegistryId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl Display for RegistryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Capability held by the election commission.
///
/// Only obtainable from [`super::Registry::create`] or [`super::Registry::authorize`],
/// and only valid for the registry that issued it. Not `Clone`, not serializable.
#[derive(Debug, PartialEq, Eq)]
pub struct Commission {
    registry: RegistryId,
    address: Address,
}

impl Commission {
    pub(super) fn issue(registry: RegistryId, address: Address) -> Self {
        Self { registry, address }
    }

    /// The registry this token belongs to.
    pub fn registry(&self) -> RegistryId {
        self.registry
    }

    /// The commission's own address.
    pub fn address(&self) -> &Address {
        &self.address
    }
}

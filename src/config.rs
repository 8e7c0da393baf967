use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::error::Result;
use crate::model::Address;

/// Default configuration file, overridable via `ELECTION_CONFIG`.
pub const CONFIG_FILE: &str = "Election.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "ELECTION_";

/// Application configuration, derived from `Election.toml` and `ELECTION_*`
/// environment variables, the latter taking precedence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    commission: Address,
    #[serde(default)]
    snapshot_path: Option<PathBuf>,
    #[serde(default = "default_log_config")]
    log_config: PathBuf,
}

fn default_log_config() -> PathBuf {
    PathBuf::from("log4rs.yaml")
}

impl Config {
    /// Load the configuration from the default sources.
    pub fn load() -> Result<Self> {
        let file = Env::var("ELECTION_CONFIG").unwrap_or_else(|| CONFIG_FILE.to_string());
        Self::load_file(file)
    }

    /// Load the configuration from the given TOML file, with environment overrides.
    /// A missing file is not an error; the environment may supply everything.
    pub fn load_file(file: impl AsRef<Path>) -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(file.as_ref()))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Extract the configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }

    /// The election commission used when a new registry has to be created.
    /// Configured via `ELECTION_COMMISSION`.
    pub fn commission(&self) -> &Address {
        &self.commission
    }

    /// Where the registry is persisted, if anywhere.
    /// Configured via `ELECTION_SNAPSHOT_PATH`.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// The log4rs configuration file.
    /// Configured via `ELECTION_LOG_CONFIG`.
    pub fn log_config(&self) -> &Path {
        &self.log_config
    }
}

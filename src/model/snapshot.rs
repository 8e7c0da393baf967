use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

use super::Registry;

/// A point-in-time copy of a registry, as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    pub registry: Registry,
}

impl Snapshot {
    /// Capture the registry as it is now.
    pub fn of(registry: &Registry) -> Self {
        Self {
            saved_at: Utc::now(),
            registry: registry.clone(),
        }
    }

    /// Write the snapshot to `path`, replacing any previous one.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so readers see either the old snapshot or the new one.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| Error::Io(e.error))?;
        sync_dir(dir)?;
        debug!("Saved snapshot of registry {} to {}", self.registry.id(), path.display());
        Ok(())
    }

    /// Read a snapshot from `path` and check the registry it contains.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let snapshot: Self = serde_json::from_reader(file)?;
        snapshot.registry.validate()?;
        debug!(
            "Loaded snapshot of registry {} taken at {}",
            snapshot.registry.id(),
            snapshot.saved_at
        );
        Ok(snapshot)
    }
}

/// Make a completed rename in `dir` durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

//! Local mirror of the last known-good session collection.
//!
//! Written after every successful save or completion and read back only when the
//! session store cannot be loaded.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::SessionRecord;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[derive(Serialize, Deserialize)]
struct CacheFile {
    sessions: Vec<SessionRecord>,
}

#[derive(Debug, Clone)]
pub struct FallbackCache {
    path: PathBuf,
}

impl FallbackCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the mirror via a temp file and rename.
    pub fn write(&self, sessions: &[SessionRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache directory {}", parent.display()))?;
        }

        let serialized = serde_json::to_string(&CacheFile {
            sessions: sessions.to_vec(),
        })?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized)
            .with_context(|| format!("failed to write cache to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to move cache into {}", self.path.display()))?;

        log_debug!("mirrored {} sessions to {}", sessions.len(), self.path.display());
        Ok(())
    }

    /// `Ok(None)` when no mirror has been written yet.
    pub fn read(&self) -> Result<Option<Vec<SessionRecord>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read cache from {}", self.path.display()))?;
        match serde_json::from_str::<CacheFile>(&contents) {
            Ok(file) => Ok(Some(file.sessions)),
            Err(err) => {
                log_warn!("ignoring corrupt session cache {}: {err}", self.path.display());
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FallbackCache::new(dir.path().join("sessions-cache.json"));
        assert!(cache.read().unwrap().is_none());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FallbackCache::new(dir.path().join("nested").join("sessions-cache.json"));
        let sessions: Vec<SessionRecord> = serde_json::from_value(json!([
            {"id": "1", "game": "kovaaks", "date": "2024-01-01", "durationMinutes": 20,
             "metadata": {"aimType": "tracking"}}
        ]))
        .unwrap();

        cache.write(&sessions).unwrap();

        assert_eq!(cache.read().unwrap(), Some(sessions));
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions-cache.json");
        fs::write(&path, "{\"sessions\": 4").unwrap();
        assert!(FallbackCache::new(path).read().unwrap().is_none());
    }
}

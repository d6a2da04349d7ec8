//! Recovery marker persistence
//!
//! The marker is written on every session mutation and read exactly once, when
//! a controller is built. A marker found at that point belongs to a session
//! that never reached end or cancel; it is reported and discarded, never
//! resumed.

use chrono::Utc;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::marker::RecoveryMarker;
use crate::error::{Error, Result};

/// File name of the marker inside the data directory
pub const MARKER_FILE_NAME: &str = "active_session.json";

/// Storage for the single recovery marker
///
/// Calls are synchronous and small; they run under the controller lock.
pub trait RecoveryStore: Send + Sync + fmt::Debug {
    fn save(&self, marker: &RecoveryMarker) -> Result<()>;

    fn load(&self) -> Result<Option<RecoveryMarker>>;

    fn clear(&self) -> Result<()>;
}

/// Marker stored as a JSON file, replaced atomically via rename
#[derive(Debug, Clone)]
pub struct FileRecoveryStore {
    path: PathBuf,
}

impl FileRecoveryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`MARKER_FILE_NAME`] inside `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(MARKER_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl RecoveryStore for FileRecoveryStore {
    fn save(&self, marker: &RecoveryMarker) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::RecoveryStore(format!("{}: {}", parent.display(), e)))?;
        }
        let contents = serde_json::to_vec_pretty(marker)?;
        let temp = self.temp_path();
        fs::write(&temp, contents)
            .map_err(|e| Error::RecoveryStore(format!("{}: {}", temp.display(), e)))?;
        fs::rename(&temp, &self.path)
            .map_err(|e| Error::RecoveryStore(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }

    fn load(&self) -> Result<Option<RecoveryMarker>> {
        match fs::read(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_slice(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::RecoveryStore(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::RecoveryStore(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// In-process marker store
#[derive(Debug, Default)]
pub struct MemoryRecoveryStore {
    marker: Mutex<Option<RecoveryMarker>>,
    writes: Mutex<u64>,
}

impl MemoryRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated with a leftover marker
    pub fn with_marker(marker: RecoveryMarker) -> Self {
        Self {
            marker: Mutex::new(Some(marker)),
            writes: Mutex::new(0),
        }
    }

    pub fn current(&self) -> Option<RecoveryMarker> {
        self.marker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves
    pub fn writes(&self) -> u64 {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecoveryStore for MemoryRecoveryStore {
    fn save(&self, marker: &RecoveryMarker) -> Result<()> {
        *self.marker.lock().unwrap_or_else(PoisonError::into_inner) = Some(marker.clone());
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<RecoveryMarker>> {
        Ok(self.current())
    }

    fn clear(&self) -> Result<()> {
        *self.marker.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Read and clear whatever marker a previous run left behind.
///
/// Failures are logged; a marker that cannot be read is treated as absent.
pub fn discard_stale_marker(store: &dyn RecoveryStore) -> Option<RecoveryMarker> {
    let marker = match store.load() {
        Ok(marker) => marker,
        Err(e) => {
            warn!(error = %e, code = e.code(), "Could not read recovery marker");
            None
        }
    };

    match &marker {
        Some(stale) => {
            warn!(
                session = %stale.name,
                exercise_index = stale.current_exercise_index,
                age_secs = stale.age(Utc::now()).num_seconds(),
                "Discarding session left over from a previous run"
            );
        }
        None => debug!("No recovery marker found"),
    }

    if let Err(e) = store.clear() {
        warn!(error = %e, "Could not clear recovery marker");
    } else if marker.is_some() {
        info!("Recovery marker cleared");
    }
    marker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workout::model::WorkoutSession;
    use tempfile::TempDir;

    fn marker() -> RecoveryMarker {
        let now = Utc::now();
        RecoveryMarker::capture(&WorkoutSession::started("Leg Day", None, now), now)
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileRecoveryStore::in_dir(&dir.path().join("nested"));

        assert!(store.load().unwrap().is_none());
        let written = marker();
        store.save(&written).unwrap();
        assert_eq!(store.load().unwrap(), Some(written));
        assert!(!store.temp_path().exists());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let store = FileRecoveryStore::in_dir(dir.path());
        fs::write(store.path(), "not json").unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(err.code(), "E400");
    }

    #[test]
    fn test_discard_stale_marker_clears_store() {
        let store = MemoryRecoveryStore::with_marker(marker());

        let discarded = discard_stale_marker(&store);
        assert_eq!(discarded.map(|m| m.name), Some("Leg Day".to_string()));
        assert!(store.current().is_none());

        assert!(discard_stale_marker(&store).is_none());
    }

    #[test]
    fn test_discard_unreadable_marker() {
        let dir = TempDir::new().unwrap();
        let store = FileRecoveryStore::in_dir(dir.path());
        fs::write(store.path(), "{").unwrap();

        assert!(discard_stale_marker(&store).is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = MemoryRecoveryStore::new();
        store.save(&marker()).unwrap();
        store.save(&marker()).unwrap();
        assert_eq!(store.writes(), 2);
    }
}

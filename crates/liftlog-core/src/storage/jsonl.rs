//! JSON Lines workout history
//!
//! One workout per line, appended as sessions finish. The file is
//! human-readable and diff-friendly; a line that fails to parse is skipped
//! with a warning instead of hiding the rest of the history.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::WorkoutStore;
use crate::domain::workout::record::Workout;
use crate::error::{Error, Result};

/// File name of the history inside the data directory
pub const WORKOUTS_FILE_NAME: &str = "workouts.jsonl";

/// Append-only JSONL file of finished workouts
#[derive(Debug, Clone)]
pub struct JsonlWorkoutStore {
    path: PathBuf,
}

impl JsonlWorkoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`WORKOUTS_FILE_NAME`] inside `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(WORKOUTS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, e: std::io::Error) -> Error {
        Error::WorkoutStore(format!("{}: {}", self.path.display(), e))
    }
}

#[async_trait]
impl WorkoutStore for JsonlWorkoutStore {
    async fn save(&self, workout: &Workout) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.store_error(e))?;
        }

        let mut line = serde_json::to_string(workout)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.store_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.store_error(e))?;
        file.flush().await.map_err(|e| self.store_error(e))?;

        debug!(path = %self.path.display(), workout_id = %workout.id, "Appended workout");
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Workout>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.store_error(e)),
        };

        let mut workouts = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Workout>(line) {
                Ok(workout) => workouts.push(workout),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = number + 1,
                    error = %e,
                    "Skipping malformed workout line"
                ),
            }
        }

        Ok(workouts.into_iter().rev().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workout::model::{Exercise, WorkoutSession};
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn workout(name: &str) -> Workout {
        let now = Utc::now();
        let mut session = WorkoutSession::started(name, None, now);
        session
            .exercises
            .push(Exercise::new("Squat", 2, "5", Duration::from_secs(120)));
        Workout::materialize(&session, now + chrono::Duration::minutes(45))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let store = JsonlWorkoutStore::in_dir(dir.path());
        assert!(store.list(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_appends_lines() {
        let dir = TempDir::new().unwrap();
        let store = JsonlWorkoutStore::in_dir(&dir.path().join("data"));

        let first = workout("Mon");
        store.save(&first).await.unwrap();
        store.save(&workout("Thu")).await.unwrap();

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);

        let listed = store.list(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Thu");
        assert_eq!(listed[1], first);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = JsonlWorkoutStore::in_dir(dir.path());
        store.save(&workout("Good")).await.unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(store.path())
            .and_then(|mut f| std::io::Write::write_all(&mut f, b"{broken\n\n"))
            .unwrap();

        let listed = store.list(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Good");
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let dir = TempDir::new().unwrap();
        let store = JsonlWorkoutStore::in_dir(dir.path());
        for i in 0..5 {
            store.save(&workout(&format!("Day {}", i))).await.unwrap();
        }

        let listed = store.list(3).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Day 4", "Day 3", "Day 2"]);
    }
}

//! Persistence for finished workouts
//!
//! The session engine never writes workouts itself: `end_workout` hands the
//! materialized record back and the caller passes it to a [`WorkoutStore`].
//! [`persist_detached`] runs that save off the mutation path.

pub mod jsonl;

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::workout::record::Workout;
use crate::error::Result;

pub use jsonl::{JsonlWorkoutStore, WORKOUTS_FILE_NAME};

/// Storage backend for completed workouts
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Persist a finished workout
    async fn save(&self, workout: &Workout) -> Result<()>;

    /// Most recent workouts first, at most `limit`
    async fn list(&self, limit: usize) -> Result<Vec<Workout>>;
}

/// Workouts kept in memory
#[derive(Debug, Default)]
pub struct MemoryWorkoutStore {
    workouts: Mutex<Vec<Workout>>,
}

impl MemoryWorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.workouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WorkoutStore for MemoryWorkoutStore {
    async fn save(&self, workout: &Workout) -> Result<()> {
        self.workouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(workout.clone());
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Workout>> {
        let workouts = self.workouts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(workouts.iter().rev().take(limit).cloned().collect())
    }
}

/// Save `workout` on a background task.
///
/// Failures are logged, not retried. Await the handle to know when the write
/// has landed.
pub fn persist_detached(store: Arc<dyn WorkoutStore>, workout: Workout) -> JoinHandle<()> {
    tokio::spawn(async move {
        match store.save(&workout).await {
            Ok(()) => info!(workout_id = %workout.id, name = %workout.name, "Workout saved"),
            Err(e) => warn!(
                workout_id = %workout.id,
                error = %e,
                code = e.code(),
                "Failed to save workout"
            ),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workout::model::WorkoutSession;
    use chrono::Utc;

    fn workout(name: &str) -> Workout {
        let now = Utc::now();
        Workout::materialize(&WorkoutSession::started(name, None, now), now)
    }

    #[tokio::test]
    async fn test_memory_store_lists_newest_first() {
        let store = MemoryWorkoutStore::new();
        for name in ["Mon", "Wed", "Fri"] {
            store.save(&workout(name)).await.unwrap();
        }

        let names: Vec<String> = store
            .list(2)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["Fri", "Wed"]);
    }

    #[tokio::test]
    async fn test_persist_detached() {
        let store = Arc::new(MemoryWorkoutStore::new());
        persist_detached(store.clone(), workout("Leg Day"))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    // Verify trait is object-safe
    fn _assert_object_safe(_: &dyn WorkoutStore) {}
}

//! Session aggregate: exercises, sets, and the current position
//!
//! The aggregate is plain data with small, invariant-preserving mutators. The
//! controller decides *when* to call them; this module decides *how* state
//! changes so that `Exercise::completed` always mirrors its sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Longest rest an exercise can carry. Longer requests are capped.
pub const MAX_REST_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// A single set within an exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub id: Uuid,
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkoutSet {
    /// Create a fresh, not-yet-logged set
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            weight: None,
            reps: None,
            completed: false,
            completed_at: None,
        }
    }

    /// A set can be logged only while it is not completed
    pub fn is_loggable(&self) -> bool {
        !self.completed
    }

    /// Weight times reps, zero when either is missing
    pub fn volume(&self) -> f64 {
        match (self.weight, self.reps) {
            (Some(weight), Some(reps)) => weight * f64::from(reps),
            _ => 0.0,
        }
    }
}

impl Default for WorkoutSet {
    fn default() -> Self {
        Self::new()
    }
}

/// An exercise with a fixed number of sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub target_sets: u32,
    /// Free-form rep range, e.g. "8-12"
    pub target_reps: String,
    #[serde(with = "duration_secs")]
    pub rest_duration: Duration,
    pub sets: Vec<WorkoutSet>,
    pub completed: bool,
}

impl Exercise {
    /// Create an exercise with `target_sets` fresh sets (at least one).
    /// `rest_duration` is capped at [`MAX_REST_DURATION`].
    pub fn new(
        name: impl Into<String>,
        target_sets: u32,
        target_reps: impl Into<String>,
        rest_duration: Duration,
    ) -> Self {
        let target_sets = target_sets.max(1);
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            target_sets,
            target_reps: target_reps.into(),
            rest_duration: rest_duration.min(MAX_REST_DURATION),
            sets: (0..target_sets).map(|_| WorkoutSet::new()).collect(),
            completed: false,
        }
    }

    /// Position of the first set that has not been logged yet
    pub fn first_incomplete_set(&self) -> Option<usize> {
        self.sets.iter().position(WorkoutSet::is_loggable)
    }

    /// Most recently logged set, by position
    pub fn last_completed_set(&self) -> Option<&WorkoutSet> {
        self.sets.iter().rev().find(|set| set.completed)
    }

    pub fn completed_set_count(&self) -> usize {
        self.sets.iter().filter(|set| set.completed).count()
    }

    pub fn set_index(&self, set_id: Uuid) -> Option<usize> {
        self.sets.iter().position(|set| set.id == set_id)
    }

    /// Recompute `completed` from the sets. Returns true if it flipped to done.
    pub fn refresh_completed(&mut self) -> bool {
        let was_completed = self.completed;
        self.completed = self.sets.iter().all(|set| set.completed);
        !was_completed && self.completed
    }

    /// Total volume of logged sets
    pub fn volume(&self) -> f64 {
        self.sets
            .iter()
            .filter(|set| set.completed)
            .map(WorkoutSet::volume)
            .sum()
    }
}

/// The single in-progress workout aggregate
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub active: bool,
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub template_ref: Option<Uuid>,
    pub exercises: Vec<Exercise>,
    pub current_exercise_index: usize,
}

impl WorkoutSession {
    /// Fresh active session with no exercises
    pub fn started(name: impl Into<String>, template_ref: Option<Uuid>, at: DateTime<Utc>) -> Self {
        Self {
            active: true,
            name: name.into(),
            start_time: Some(at),
            template_ref,
            exercises: Vec::new(),
            current_exercise_index: 0,
        }
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.exercises.get(self.current_exercise_index)
    }

    pub fn current_exercise_mut(&mut self) -> Option<&mut Exercise> {
        self.exercises.get_mut(self.current_exercise_index)
    }

    pub fn exercise_index(&self, exercise_id: Uuid) -> Option<usize> {
        self.exercises.iter().position(|e| e.id == exercise_id)
    }

    pub fn exercise_mut(&mut self, exercise_id: Uuid) -> Option<&mut Exercise> {
        self.exercises.iter_mut().find(|e| e.id == exercise_id)
    }

    /// Whether `index` is a valid navigation target
    pub fn is_valid_index(&self, index: usize) -> bool {
        index < self.exercises.len()
    }

    pub fn total_sets_completed(&self) -> usize {
        self.exercises.iter().map(Exercise::completed_set_count).sum()
    }

    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    pub fn total_volume(&self) -> f64 {
        self.exercises.iter().map(Exercise::volume).sum()
    }

    /// Time since the session started, zero if it has not
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        self.start_time
            .and_then(|start| (now - start).to_std().ok())
            .unwrap_or_default()
    }
}

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

//! Persistable record of a finished workout
//!
//! Built from the live session at `end_workout` time. Every field is owned, so
//! the record stays valid after the session is reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{Exercise, WorkoutSession, WorkoutSet};

/// A finished workout, ready for the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: Uuid,
    pub name: String,
    pub template_ref: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub exercises: Vec<WorkoutExerciseRecord>,
    pub total_sets_completed: usize,
    pub total_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExerciseRecord {
    pub id: Uuid,
    pub position: usize,
    pub name: String,
    pub target_sets: u32,
    pub target_reps: String,
    pub rest_secs: u64,
    pub completed: bool,
    pub sets: Vec<WorkoutSetRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSetRecord {
    pub id: Uuid,
    /// 1-based set number within the exercise
    pub set_number: usize,
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkoutSetRecord {
    fn from_set(set_number: usize, set: &WorkoutSet) -> Self {
        Self {
            id: set.id,
            set_number,
            weight: set.weight,
            reps: set.reps,
            completed: set.completed,
            completed_at: set.completed_at,
        }
    }
}

impl WorkoutExerciseRecord {
    fn from_exercise(position: usize, exercise: &Exercise) -> Self {
        Self {
            id: exercise.id,
            position,
            name: exercise.name.clone(),
            target_sets: exercise.target_sets,
            target_reps: exercise.target_reps.clone(),
            rest_secs: exercise.rest_duration.as_secs(),
            completed: exercise.completed,
            sets: exercise
                .sets
                .iter()
                .enumerate()
                .map(|(i, set)| WorkoutSetRecord::from_set(i + 1, set))
                .collect(),
        }
    }
}

impl Workout {
    /// Materialize a record from the session as it stands at `ended_at`
    pub fn materialize(session: &WorkoutSession, ended_at: DateTime<Utc>) -> Self {
        let started_at = session.start_time.unwrap_or(ended_at);
        Self {
            id: Uuid::new_v4(),
            name: session.name.clone(),
            template_ref: session.template_ref,
            started_at,
            ended_at,
            duration_secs: session.elapsed_at(ended_at).as_secs(),
            exercises: session
                .exercises
                .iter()
                .enumerate()
                .map(|(i, exercise)| WorkoutExerciseRecord::from_exercise(i, exercise))
                .collect(),
            total_sets_completed: session.total_sets_completed(),
            total_volume: session.total_volume(),
        }
    }

    pub fn completed_exercises(&self) -> usize {
        self.exercises.iter().filter(|e| e.completed).count()
    }
}

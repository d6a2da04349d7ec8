//! Read-only projection of the session for external presentation surfaces

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::model::WorkoutSession;
use super::timer::RestCountdown;

/// Everything a lock-screen style display needs, derived from session state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionProjection {
    pub session_name: String,
    pub exercise_name: Option<String>,
    /// 1-based number of the set being worked on, capped at `total_sets`
    pub current_set: usize,
    pub total_sets: usize,
    pub last_weight: Option<f64>,
    pub last_reps: Option<u32>,
    pub is_resting: bool,
    pub rest_remaining_secs: u64,
    pub rest_total_secs: u64,
    pub elapsed_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub total_sets_completed: usize,
    pub exercise_count: usize,
    /// Push counter assigned by the sync adapter
    pub revision: u64,
}

impl SessionProjection {
    pub fn capture(session: &WorkoutSession, rest: Option<&RestCountdown>, elapsed: Duration) -> Self {
        let current = session.current_exercise();
        let (current_set, total_sets) = current
            .map(|exercise| {
                let total = exercise.sets.len();
                ((exercise.completed_set_count() + 1).min(total), total)
            })
            .unwrap_or((0, 0));
        let last = current.and_then(|exercise| exercise.last_completed_set());

        Self {
            session_name: session.name.clone(),
            exercise_name: current.map(|exercise| exercise.name.clone()),
            current_set,
            total_sets,
            last_weight: last.and_then(|set| set.weight),
            last_reps: last.and_then(|set| set.reps),
            is_resting: rest.is_some(),
            rest_remaining_secs: rest.map_or(0, |r| r.remaining_secs),
            rest_total_secs: rest.map_or(0, |r| r.total.as_secs()),
            elapsed_secs: elapsed.as_secs(),
            started_at: session.start_time,
            total_sets_completed: session.total_sets_completed(),
            exercise_count: session.exercises.len(),
            revision: 0,
        }
    }

    /// Elapsed time as `H:MM:SS` or `M:SS`
    pub fn elapsed_display(&self) -> String {
        format_clock(self.elapsed_secs)
    }

    pub fn rest_display(&self) -> String {
        format_clock(self.rest_remaining_secs)
    }
}

fn format_clock(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workout::model::Exercise;
    use uuid::Uuid;

    #[test]
    fn test_projection_of_empty_session() {
        let session = WorkoutSession::started("Empty", None, Utc::now());
        let projection = SessionProjection::capture(&session, None, Duration::ZERO);

        assert_eq!(projection.session_name, "Empty");
        assert!(projection.exercise_name.is_none());
        assert_eq!(projection.current_set, 0);
        assert_eq!(projection.total_sets, 0);
        assert!(!projection.is_resting);
    }

    #[test]
    fn test_projection_tracks_current_exercise() {
        let now = Utc::now();
        let mut session = WorkoutSession::started("Legs", None, now);
        session
            .exercises
            .push(Exercise::new("Squat", 3, "5", Duration::from_secs(120)));
        {
            let set = &mut session.exercises[0].sets[0];
            set.completed = true;
            set.weight = Some(140.0);
            set.reps = Some(5);
        }
        let rest = RestCountdown::start(Uuid::new_v4(), Duration::from_secs(120), now);

        let projection = SessionProjection::capture(&session, Some(&rest), Duration::from_secs(75));

        assert_eq!(projection.exercise_name.as_deref(), Some("Squat"));
        assert_eq!(projection.current_set, 2);
        assert_eq!(projection.total_sets, 3);
        assert_eq!(projection.last_weight, Some(140.0));
        assert_eq!(projection.last_reps, Some(5));
        assert!(projection.is_resting);
        assert_eq!(projection.rest_remaining_secs, 120);
        assert_eq!(projection.total_sets_completed, 1);
        assert_eq!(projection.elapsed_display(), "1:15");
        assert_eq!(projection.rest_display(), "2:00");
    }

    #[test]
    fn test_current_set_is_capped() {
        let mut session = WorkoutSession::started("Arms", None, Utc::now());
        session
            .exercises
            .push(Exercise::new("Curl", 1, "10", Duration::from_secs(60)));
        session.exercises[0].sets[0].completed = true;

        let projection = SessionProjection::capture(&session, None, Duration::ZERO);
        assert_eq!(projection.current_set, 1);
        assert_eq!(projection.total_sets, 1);
    }

    #[test]
    fn test_format_clock_with_hours() {
        assert_eq!(format_clock(3725), "1:02:05");
        assert_eq!(format_clock(59), "0:59");
    }
}

//! Recovery marker: a minimal breadcrumb of the live session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::workout::model::WorkoutSession;

/// Enough to tell, after a crash, that a session was in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryMarker {
    pub active: bool,
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub current_exercise_index: usize,
    pub written_at: DateTime<Utc>,
}

impl RecoveryMarker {
    pub fn capture(session: &WorkoutSession, written_at: DateTime<Utc>) -> Self {
        Self {
            active: session.active,
            name: session.name.clone(),
            start_time: session.start_time,
            current_exercise_index: session.current_exercise_index,
            written_at,
        }
    }

    /// How long ago the marker was last written
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.written_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_copies_position() {
        let now = Utc::now();
        let mut session = WorkoutSession::started("Pull", None, now);
        session.current_exercise_index = 2;

        let marker = RecoveryMarker::capture(&session, now);
        assert!(marker.active);
        assert_eq!(marker.name, "Pull");
        assert_eq!(marker.start_time, Some(now));
        assert_eq!(marker.current_exercise_index, 2);
        assert_eq!(marker.age(now + chrono::Duration::seconds(30)).num_seconds(), 30);
    }
}

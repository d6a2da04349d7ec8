//! Session events and the append-only event log
//!
//! Events record intent (what happened) with just the identifiers needed to
//! replay it. They never carry snapshots of prior state; reversing a change is
//! the undo buffer's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An action applied to the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        name: String,
        template_ref: Option<Uuid>,
    },
    ExerciseStarted {
        exercise_id: Uuid,
        name: String,
    },
    SetLogged {
        exercise_id: Uuid,
        set_id: Uuid,
        weight: f64,
        reps: u32,
    },
    SetEdited {
        exercise_id: Uuid,
        set_id: Uuid,
        weight: Option<f64>,
        reps: Option<u32>,
    },
    SetUndone {
        exercise_id: Uuid,
        set_id: Uuid,
    },
    RestTimerStarted {
        exercise_id: Uuid,
        duration_secs: u64,
    },
    RestTimerSkipped {
        remaining_secs: u64,
    },
    ExerciseCompleted {
        exercise_id: Uuid,
    },
    SessionEnded {
        duration_secs: u64,
    },
    SessionCancelled,
}

/// Discriminant of a [`SessionEvent`], handy for filtering and counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    SessionStarted,
    ExerciseStarted,
    SetLogged,
    SetEdited,
    SetUndone,
    RestTimerStarted,
    RestTimerSkipped,
    ExerciseCompleted,
    SessionEnded,
    SessionCancelled,
}

impl SessionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::ExerciseStarted => "exercise_started",
            Self::SetLogged => "set_logged",
            Self::SetEdited => "set_edited",
            Self::SetUndone => "set_undone",
            Self::RestTimerStarted => "rest_timer_started",
            Self::RestTimerSkipped => "rest_timer_skipped",
            Self::ExerciseCompleted => "exercise_completed",
            Self::SessionEnded => "session_ended",
            Self::SessionCancelled => "session_cancelled",
        }
    }
}

impl std::fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SessionEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            Self::SessionStarted { .. } => SessionEventKind::SessionStarted,
            Self::ExerciseStarted { .. } => SessionEventKind::ExerciseStarted,
            Self::SetLogged { .. } => SessionEventKind::SetLogged,
            Self::SetEdited { .. } => SessionEventKind::SetEdited,
            Self::SetUndone { .. } => SessionEventKind::SetUndone,
            Self::RestTimerStarted { .. } => SessionEventKind::RestTimerStarted,
            Self::RestTimerSkipped { .. } => SessionEventKind::RestTimerSkipped,
            Self::ExerciseCompleted { .. } => SessionEventKind::ExerciseCompleted,
            Self::SessionEnded { .. } => SessionEventKind::SessionEnded,
            Self::SessionCancelled => SessionEventKind::SessionCancelled,
        }
    }
}

/// An event as recorded in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Position in the log; strictly increasing in apply order
    pub sequence: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Append-only record of session events
///
/// Ordering comes from `sequence`, not timestamps: two events applied within
/// the same second keep the order they were applied in.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LoggedEvent>,
    next_sequence: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number
    pub fn append(&mut self, at: DateTime<Utc>, event: SessionEvent) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(LoggedEvent {
            sequence,
            at,
            event,
        });
        sequence
    }

    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LoggedEvent> {
        self.entries.last()
    }

    pub fn count(&self, kind: SessionEventKind) -> usize {
        self.entries.iter().filter(|e| e.event.kind() == kind).count()
    }

    /// Discard the whole log, handing back what it held
    pub fn drain(&mut self) -> Vec<LoggedEvent> {
        self.next_sequence = 0;
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_orders_by_sequence() {
        let mut log = EventLog::new();
        let at = Utc::now();
        let exercise_id = Uuid::new_v4();

        let first = log.append(
            at,
            SessionEvent::SessionStarted {
                name: "Push".to_string(),
                template_ref: None,
            },
        );
        let second = log.append(
            at,
            SessionEvent::ExerciseStarted {
                exercise_id,
                name: "Bench".to_string(),
            },
        );

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(log.len(), 2);
        // Same timestamp, order still preserved
        assert_eq!(log.entries()[0].at, log.entries()[1].at);
        assert_eq!(log.entries()[1].event.kind(), SessionEventKind::ExerciseStarted);
    }

    #[test]
    fn test_count_by_kind() {
        let mut log = EventLog::new();
        let at = Utc::now();
        let exercise_id = Uuid::new_v4();

        for _ in 0..3 {
            log.append(
                at,
                SessionEvent::SetLogged {
                    exercise_id,
                    set_id: Uuid::new_v4(),
                    weight: 135.0,
                    reps: 8,
                },
            );
        }
        log.append(at, SessionEvent::ExerciseCompleted { exercise_id });

        assert_eq!(log.count(SessionEventKind::SetLogged), 3);
        assert_eq!(log.count(SessionEventKind::ExerciseCompleted), 1);
        assert_eq!(log.count(SessionEventKind::SetUndone), 0);
    }

    #[test]
    fn test_drain_clears_and_restarts_sequence() {
        let mut log = EventLog::new();
        log.append(Utc::now(), SessionEvent::SessionCancelled);

        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert!(log.is_empty());
        assert_eq!(log.append(Utc::now(), SessionEvent::SessionCancelled), 0);
    }

    #[test]
    fn test_logged_event_serialization() {
        let mut log = EventLog::new();
        log.append(Utc::now(), SessionEvent::RestTimerSkipped { remaining_secs: 42 });

        let json = serde_json::to_value(log.last().unwrap()).unwrap();
        assert_eq!(json["type"], "rest_timer_skipped");
        assert_eq!(json["remaining_secs"], 42);
        assert_eq!(json["sequence"], 0);
    }
}

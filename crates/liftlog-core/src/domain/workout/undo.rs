//! Single-slot undo buffer for the most recently logged set

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::model::WorkoutSet;

/// Default length of the undo window
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

/// Pre-mutation values of a set, captured when it is logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoRecord {
    pub exercise_id: Uuid,
    pub set_id: Uuid,
    pub previous_weight: Option<f64>,
    pub previous_reps: Option<u32>,
    pub was_completed: bool,
    pub captured_at: DateTime<Utc>,
}

impl UndoRecord {
    pub fn capture(exercise_id: Uuid, set: &WorkoutSet, captured_at: DateTime<Utc>) -> Self {
        Self {
            exercise_id,
            set_id: set.id,
            previous_weight: set.weight,
            previous_reps: set.reps,
            was_completed: set.completed,
            captured_at,
        }
    }

    /// Expired once strictly more than `window` has passed since capture
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match chrono::Duration::from_std(window) {
            Ok(window) => now - self.captured_at > window,
            Err(_) => false,
        }
    }
}

/// Holds at most one pending undo
#[derive(Debug, Clone)]
pub struct UndoBuffer {
    pending: Option<UndoRecord>,
    window: Duration,
}

impl Default for UndoBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_WINDOW)
    }
}

impl UndoBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: None,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Store a record, discarding any earlier one
    pub fn arm(&mut self, record: UndoRecord) -> Option<UndoRecord> {
        self.pending.replace(record)
    }

    /// Take the pending record if it is still inside the window.
    ///
    /// An expired record is dropped either way.
    pub fn take_valid(&mut self, now: DateTime<Utc>) -> Option<UndoRecord> {
        let record = self.pending.take()?;
        if record.is_expired(now, self.window) {
            None
        } else {
            Some(record)
        }
    }

    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|record| !record.is_expired(now, self.window))
    }

    pub fn pending(&self) -> Option<&UndoRecord> {
        self.pending.as_ref()
    }

    pub fn clear(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(at: DateTime<Utc>) -> UndoRecord {
        UndoRecord::capture(Uuid::new_v4(), &WorkoutSet::new(), at)
    }

    #[test]
    fn test_capture_copies_previous_values() {
        let mut set = WorkoutSet::new();
        set.weight = Some(60.0);
        set.reps = Some(12);
        let exercise_id = Uuid::new_v4();
        let now = Utc::now();

        let record = UndoRecord::capture(exercise_id, &set, now);

        assert_eq!(record.exercise_id, exercise_id);
        assert_eq!(record.set_id, set.id);
        assert_eq!(record.previous_weight, Some(60.0));
        assert_eq!(record.previous_reps, Some(12));
        assert!(!record.was_completed);
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let record = record_at(now);

        assert!(!record.is_expired(now + chrono::Duration::seconds(5), DEFAULT_UNDO_WINDOW));
        assert!(record.is_expired(
            now + chrono::Duration::milliseconds(5001),
            DEFAULT_UNDO_WINDOW
        ));
    }

    #[test]
    fn test_take_valid_consumes_once() {
        let now = Utc::now();
        let mut buffer = UndoBuffer::default();
        buffer.arm(record_at(now));

        assert!(buffer.is_available(now));
        assert!(buffer.take_valid(now).is_some());
        assert!(buffer.take_valid(now).is_none());
        assert!(!buffer.is_available(now));
    }

    #[test]
    fn test_take_valid_drops_expired_record() {
        let now = Utc::now();
        let mut buffer = UndoBuffer::default();
        buffer.arm(record_at(now));

        let later = now + chrono::Duration::seconds(6);
        assert!(!buffer.is_available(later));
        assert!(buffer.take_valid(later).is_none());
        assert!(buffer.pending().is_none());
    }

    #[test]
    fn test_arm_replaces_previous_record() {
        let now = Utc::now();
        let mut buffer = UndoBuffer::default();
        let first = record_at(now);
        let first_set = first.set_id;
        buffer.arm(first);

        let replaced = buffer.arm(record_at(now));
        assert_eq!(replaced.map(|r| r.set_id), Some(first_set));
        assert_ne!(buffer.pending().map(|r| r.set_id), Some(first_set));
    }
}

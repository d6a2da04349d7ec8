//! LiftLog Core Library
//!
//! This crate provides the live workout session engine behind LiftLog:
//! - Session lifecycle controller (start, log sets, navigate, end, cancel)
//! - Rest countdown, elapsed-time ticker and undo-expiry timers
//! - Append-only session event log
//! - Bounded-window undo of the last logged set
//! - External sync adapter for presentation surfaces
//! - Crash-recovery marker
//! - Workout history storage (JSONL)
//! - Configuration

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::Config;
    pub use crate::domain::recovery::{FileRecoveryStore, RecoveryMarker, RecoveryStore};
    pub use crate::domain::workout::{
        PresentationSurface, SessionAlert, SessionController, SessionEvent, SessionProjection, Workout,
        WorkoutTemplate,
    };
    pub use crate::error::{Error, Result};
    pub use crate::storage::{JsonlWorkoutStore, WorkoutStore};
}

//! Workout session domain module
//!
//! Tracks one in-progress workout: exercises, sets, a rest countdown, an
//! elapsed-time ticker, and a short undo window for the last logged set, while
//! mirroring state to an external presentation surface.
//!
//! # Architecture
//!
//! - **Entities**: `WorkoutSession`, `Exercise`, `WorkoutSet`, `Workout`
//! - **Event log**: `EventLog` of `SessionEvent`s, cleared on every reset
//! - **Timers**: `TimerScheduler` handing out cancellable `TimerHandle`s
//! - **Controller**: `SessionController` serializing every mutation and tick
//! - **Sync**: `ExternalSyncAdapter` pushing `SessionProjection`s to a
//!   `PresentationSurface`
//!
//! # Example
//!
//! ```ignore
//! use liftlog_core::domain::workout::SessionController;
//! use std::time::Duration;
//!
//! let controller = SessionController::new()?;
//! controller.start_session("Leg Day", None);
//! controller.add_exercise("Squat", 3, "5", Duration::from_secs(180));
//!
//! controller.complete_current_set(140.0, 5);
//! controller.undo_last_action();
//!
//! let workout = controller.end_workout();
//! ```

pub mod alert;
pub mod controller;
pub mod event;
pub mod model;
pub mod projection;
pub mod record;
pub mod sync;
pub mod template;
pub mod timer;
pub mod undo;

// Re-export main types
pub use alert::{AlertBus, SessionAlert};
pub use controller::{SessionController, SessionControllerBuilder};
pub use event::{EventLog, LoggedEvent, SessionEvent, SessionEventKind};
pub use model::{Exercise, MAX_REST_DURATION, WorkoutSession, WorkoutSet};
pub use projection::SessionProjection;
pub use record::{Workout, WorkoutExerciseRecord, WorkoutSetRecord};
pub use sync::{ExternalSyncAdapter, LogSurface, NoopSurface, PresentationSurface, RecordingSurface, SurfaceUpdate};
pub use template::{PlannedExercise, WorkoutTemplate};
pub use timer::{RestCountdown, TimerHandle, TimerKind, TimerScheduler};
pub use undo::{UndoRecord, DEFAULT_UNDO_WINDOW};

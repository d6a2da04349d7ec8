//! Session lifecycle controller
//!
//! The controller is the single owner of the in-progress session. Every public
//! operation runs through [`SessionController::apply_and_sync`]: take the lock,
//! apply the mutation (state, event log, timers), then notify once. Notify
//! pushes a fresh projection through the sync adapter and rewrites the
//! recovery marker. Timer ticks take the same lock, so a tick always sees a
//! fully applied mutation and never interleaves with one.
//!
//! Operations are total. An invalid precondition (inactive session, bad
//! index, nothing to undo) is a silent no-op reported as `false`/`None`, and
//! no-ops never notify.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::alert::{AlertBus, SessionAlert};
use super::event::{EventLog, LoggedEvent, SessionEvent};
use super::model::{Exercise, WorkoutSession};
use super::projection::SessionProjection;
use super::record::Workout;
use super::sync::{ExternalSyncAdapter, NoopSurface, PresentationSurface, SurfaceUpdate};
use super::template::WorkoutTemplate;
use super::timer::{RestCountdown, RestTick, TickFlow, TickTarget, TimerKind, TimerScheduler, TimerSlots};
use super::undo::{UndoBuffer, UndoRecord};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, SessionConfig, TimerConfig};
use crate::domain::recovery::{MemoryRecoveryStore, RecoveryMarker, RecoveryStore, discard_stale_marker};
use crate::error::Result;

/// Shortest tick period accepted by the timers
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Mutable state guarded by the controller lock
#[derive(Debug)]
struct SessionCore {
    session: WorkoutSession,
    log: EventLog,
    undo: UndoBuffer,
    rest: Option<RestCountdown>,
    elapsed: Duration,
    timers: TimerSlots,
}

impl SessionCore {
    fn new(undo_window: Duration) -> Self {
        Self {
            session: WorkoutSession::default(),
            log: EventLog::new(),
            undo: UndoBuffer::new(undo_window),
            rest: None,
            elapsed: Duration::ZERO,
            timers: TimerSlots::new(),
        }
    }

    /// Back to an empty, inactive session with every timer stopped.
    /// Returns the discarded log.
    fn reset(&mut self) -> Vec<LoggedEvent> {
        self.timers.cancel_all();
        self.undo.clear();
        self.rest = None;
        self.elapsed = Duration::ZERO;
        self.session = WorkoutSession::default();
        self.log.drain()
    }

    /// Stop the rest countdown without recording anything
    fn cancel_rest(&mut self) -> Option<RestCountdown> {
        self.timers.cancel(TimerKind::Rest);
        self.rest.take()
    }

    fn push_exercise(&mut self, exercise: Exercise, now: DateTime<Utc>) -> Uuid {
        let exercise_id = exercise.id;
        self.log.append(
            now,
            SessionEvent::ExerciseStarted {
                exercise_id,
                name: exercise.name.clone(),
            },
        );
        debug!(exercise_id = %exercise_id, name = %exercise.name, sets = exercise.sets.len(), "Exercise added");
        self.session.exercises.push(exercise);
        exercise_id
    }

    fn projection(&self) -> SessionProjection {
        SessionProjection::capture(&self.session, self.rest.as_ref(), self.elapsed)
    }
}

/// State shared between controller handles and timer tasks
struct Shared {
    core: Mutex<SessionCore>,
    clock: Arc<dyn Clock>,
    scheduler: TimerScheduler,
    sync: ExternalSyncAdapter,
    recovery: Arc<dyn RecoveryStore>,
    alerts: AlertBus,
    session_config: SessionConfig,
    timer_config: TimerConfig,
    discarded_marker: Option<RecoveryMarker>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick_interval(&self) -> Duration {
        self.timer_config.tick_interval().max(MIN_TICK_INTERVAL)
    }

    /// Start (or restart) the timer of `kind`, replacing any running one
    fn arm(self: &Arc<Self>, core: &mut SessionCore, kind: TimerKind) {
        let generation = core.timers.next_generation();
        let target = Arc::downgrade(self);
        let handle = match kind {
            TimerKind::UndoExpiry => self
                .scheduler
                .start_once(kind, generation, core.undo.window(), target),
            TimerKind::Elapsed | TimerKind::Rest => {
                self.scheduler
                    .start_interval(kind, generation, self.tick_interval(), target)
            }
        };
        core.timers.install(handle);
        trace!(timer = %kind, generation, "Timer armed");
    }

    fn push_projection(&self, core: &SessionCore) -> u64 {
        self.sync.push(core.projection())
    }

    /// Single post-mutation hook
    fn notify(&self, core: &SessionCore, now: DateTime<Utc>) {
        let revision = self.push_projection(core);
        trace!(revision, "Projection pushed");
        if core.session.active {
            let marker = RecoveryMarker::capture(&core.session, now);
            if let Err(e) = self.recovery.save(&marker) {
                warn!(error = %e, code = e.code(), "Could not write recovery marker");
            }
        }
    }

    fn begin(
        self: &Arc<Self>,
        core: &mut SessionCore,
        name: String,
        template_ref: Option<Uuid>,
        now: DateTime<Utc>,
    ) {
        if core.session.active {
            warn!(
                previous = %core.session.name,
                sets_completed = core.session.total_sets_completed(),
                "Starting a new session discards the active one"
            );
        }
        core.reset();
        core.session = WorkoutSession::started(name, template_ref, now);
        core.log.append(
            now,
            SessionEvent::SessionStarted {
                name: core.session.name.clone(),
                template_ref,
            },
        );
        self.arm(core, TimerKind::Elapsed);
        info!(session = %core.session.name, template = ?template_ref, "Session started");
    }

    /// Log the first open set of the current exercise
    fn log_set(self: &Arc<Self>, core: &mut SessionCore, weight: f64, reps: u32, now: DateTime<Utc>) -> Option<()> {
        if !core.session.active {
            return None;
        }
        let index = core.session.current_exercise_index;
        let exercise = core.session.exercises.get_mut(index)?;
        let set_index = exercise.first_incomplete_set()?;
        let exercise_id = exercise.id;

        let set = &mut exercise.sets[set_index];
        let record = UndoRecord::capture(exercise_id, set, now);
        set.weight = Some(weight);
        set.reps = Some(reps);
        set.completed = true;
        set.completed_at = Some(now);
        let set_id = set.id;

        let exercise_done = exercise.refresh_completed();
        let rest_duration = exercise.rest_duration;

        core.log.append(
            now,
            SessionEvent::SetLogged {
                exercise_id,
                set_id,
                weight,
                reps,
            },
        );
        if exercise_done {
            core.log
                .append(now, SessionEvent::ExerciseCompleted { exercise_id });
        }

        core.undo.arm(record);
        self.arm(core, TimerKind::UndoExpiry);

        core.cancel_rest();
        if rest_duration.is_zero() {
            debug!(exercise_id = %exercise_id, "No rest configured");
        } else {
            core.rest = Some(RestCountdown::start(exercise_id, rest_duration, now));
            core.log.append(
                now,
                SessionEvent::RestTimerStarted {
                    exercise_id,
                    duration_secs: rest_duration.as_secs(),
                },
            );
            self.arm(core, TimerKind::Rest);
        }

        debug!(
            exercise_id = %exercise_id,
            set = set_index + 1,
            weight,
            reps,
            "Set logged"
        );

        if exercise_done {
            info!(exercise_id = %exercise_id, "Exercise completed");
            if self.session_config.auto_advance && core.session.is_valid_index(index + 1) {
                core.session.current_exercise_index = index + 1;
                debug!(index = index + 1, "Auto-advanced to next exercise");
            }
        }
        Some(())
    }

    fn on_rest_tick(&self, core: &mut SessionCore, now: DateTime<Utc>) -> TickFlow {
        let Some(rest) = core.rest.as_mut() else {
            core.timers.cancel(TimerKind::Rest);
            return TickFlow::Stop;
        };
        let outcome = rest.tick(now, self.timer_config.rest_warning_secs);
        let remaining_secs = rest.remaining_secs;
        let exercise_id = rest.exercise_id;

        match outcome {
            RestTick::Running => {
                self.push_projection(core);
                TickFlow::Continue
            }
            RestTick::NearlyDone => {
                self.push_projection(core);
                self.alerts
                    .emit(SessionAlert::RestNearlyDone { remaining_secs });
                debug!(remaining_secs, "Rest nearly done");
                TickFlow::Continue
            }
            RestTick::Finished => {
                self.finish_rest(core, exercise_id);
                TickFlow::Stop
            }
        }
    }

    fn finish_rest(&self, core: &mut SessionCore, exercise_id: Uuid) {
        core.cancel_rest();
        self.push_projection(core);
        self.alerts.emit(SessionAlert::RestFinished { exercise_id });
        info!(exercise_id = %exercise_id, "Rest finished");
    }
}

impl TickTarget for Shared {
    fn on_tick(&self, kind: TimerKind, generation: u64) -> TickFlow {
        let now = self.clock.now();
        let mut core = self.lock();
        if !core.timers.is_current(kind, generation) {
            trace!(timer = %kind, generation, "Ignoring stale tick");
            return TickFlow::Stop;
        }

        match kind {
            TimerKind::Elapsed => {
                core.elapsed = core.session.elapsed_at(now);
                TickFlow::Continue
            }
            TimerKind::Rest => self.on_rest_tick(&mut core, now),
            TimerKind::UndoExpiry => {
                core.timers.cancel(TimerKind::UndoExpiry);
                if let Some(record) = core.undo.pending().cloned() {
                    core.undo.clear();
                    self.alerts
                        .emit(SessionAlert::UndoWindowClosed { set_id: record.set_id });
                    debug!(set_id = %record.set_id, "Undo window closed");
                }
                TickFlow::Stop
            }
        }
    }
}

/// Handle to the one in-progress workout session
///
/// Cheap to clone; every clone drives the same session. Build it with
/// [`SessionController::builder`] from inside a Tokio runtime.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.lock();
        f.debug_struct("SessionController")
            .field("active", &core.session.active)
            .field("name", &core.session.name)
            .field("exercises", &core.session.exercises.len())
            .field("events", &core.log.len())
            .finish()
    }
}

impl SessionController {
    pub fn builder() -> SessionControllerBuilder {
        SessionControllerBuilder::default()
    }

    /// Controller with default settings and no external collaborators
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Run a mutation under the lock and notify if it took effect
    fn apply_and_sync<R>(
        &self,
        op: &'static str,
        mutation: impl FnOnce(&mut SessionCore, &Arc<Shared>, DateTime<Utc>) -> Option<R>,
    ) -> Option<R> {
        let shared = &self.shared;
        let now = shared.clock.now();
        let mut core = shared.lock();
        match mutation(&mut core, shared, now) {
            Some(value) => {
                if core.session.active {
                    core.elapsed = core.session.elapsed_at(now);
                }
                shared.notify(&core, now);
                trace!(op, "Applied");
                Some(value)
            }
            None => {
                trace!(op, "No-op");
                None
            }
        }
    }

    /// Full reset shared by cancel and end
    fn teardown(&self, core: &mut SessionCore) {
        let discarded = core.reset();
        debug!(events = discarded.len(), "Event log cleared");
        self.shared.sync.end();
        if let Err(e) = self.shared.recovery.clear() {
            warn!(error = %e, code = e.code(), "Could not clear recovery marker");
        }
    }

    // ========== Lifecycle ==========

    /// Start a new session.
    ///
    /// A session that is already active is discarded without being persisted.
    pub fn start_session(&self, name: impl Into<String>, template_ref: Option<Uuid>) {
        let name = name.into();
        self.apply_and_sync("start_session", |core, shared, now| {
            shared.begin(core, name, template_ref, now);
            Some(())
        });
    }

    /// Start a session pre-populated with the template's exercises, in order
    pub fn start_session_from_template(&self, template: &WorkoutTemplate) {
        self.apply_and_sync("start_session_from_template", |core, shared, now| {
            shared.begin(core, template.name.clone(), Some(template.id), now);
            for planned in &template.exercises {
                core.push_exercise(
                    Exercise::new(
                        planned.name.clone(),
                        planned.target_sets,
                        planned.target_reps.clone(),
                        planned.rest_duration(),
                    ),
                    now,
                );
            }
            Some(())
        });
    }

    /// Discard the session without producing a record
    pub fn cancel_workout(&self) -> bool {
        let now = self.shared.clock.now();
        let mut core = self.shared.lock();
        if !core.session.active {
            return false;
        }
        core.log.append(now, SessionEvent::SessionCancelled);
        let name = core.session.name.clone();
        self.teardown(&mut core);
        info!(session = %name, "Session cancelled");
        true
    }

    /// Finish the session and hand back its record for persistence
    pub fn end_workout(&self) -> Option<Workout> {
        let now = self.shared.clock.now();
        let mut core = self.shared.lock();
        if !core.session.active {
            return None;
        }
        let duration = core.session.elapsed_at(now);
        core.log.append(
            now,
            SessionEvent::SessionEnded {
                duration_secs: duration.as_secs(),
            },
        );
        let workout = Workout::materialize(&core.session, now);
        self.teardown(&mut core);
        info!(
            session = %workout.name,
            duration_secs = workout.duration_secs,
            sets = workout.total_sets_completed,
            volume = workout.total_volume,
            "Session ended"
        );
        Some(workout)
    }

    // ========== Exercises and sets ==========

    /// Append an exercise with `target_sets` fresh sets (at least one)
    pub fn add_exercise(
        &self,
        name: impl Into<String>,
        target_sets: u32,
        target_reps: impl Into<String>,
        rest_duration: Duration,
    ) -> Option<Uuid> {
        let exercise = Exercise::new(name, target_sets, target_reps, rest_duration);
        self.apply_and_sync("add_exercise", |core, _, now| {
            if !core.session.active {
                return None;
            }
            Some(core.push_exercise(exercise, now))
        })
    }

    /// Append an exercise using the configured default targets
    pub fn add_default_exercise(&self, name: impl Into<String>) -> Option<Uuid> {
        let defaults = &self.shared.session_config;
        self.add_exercise(
            name,
            defaults.default_target_sets,
            defaults.default_target_reps.clone(),
            defaults.default_rest(),
        )
    }

    /// Log the first open set of the current exercise.
    ///
    /// Arms the undo window and starts the exercise's rest countdown. No-op
    /// when the current exercise has no open set.
    pub fn complete_current_set(&self, weight: f64, reps: u32) -> bool {
        self.apply_and_sync("complete_current_set", |core, shared, now| {
            shared.log_set(core, weight, reps, now)
        })
        .is_some()
    }

    /// Log the next set with the values of the last logged set of the current
    /// exercise. No-op when those values are all zero or absent.
    pub fn quick_complete_set(&self) -> bool {
        self.apply_and_sync("quick_complete_set", |core, shared, now| {
            let (weight, reps) = core
                .session
                .current_exercise()
                .and_then(Exercise::last_completed_set)
                .map(|set| (set.weight.unwrap_or(0.0), set.reps.unwrap_or(0)))
                .unwrap_or((0.0, 0));
            if weight <= 0.0 && reps == 0 {
                return None;
            }
            shared.log_set(core, weight, reps, now)
        })
        .is_some()
    }

    /// Pre-fill planned values on a set that has not been logged yet
    pub fn update_set(
        &self,
        exercise_index: usize,
        set_index: usize,
        weight: Option<f64>,
        reps: Option<u32>,
    ) -> bool {
        self.apply_and_sync("update_set", |core, _, now| {
            if !core.session.active {
                return None;
            }
            let exercise = core.session.exercises.get_mut(exercise_index)?;
            let exercise_id = exercise.id;
            let set = exercise.sets.get_mut(set_index)?;
            if !set.is_loggable() {
                return None;
            }
            set.weight = weight;
            set.reps = reps;
            let set_id = set.id;
            core.log.append(
                now,
                SessionEvent::SetEdited {
                    exercise_id,
                    set_id,
                    weight,
                    reps,
                },
            );
            Some(())
        })
        .is_some()
    }

    /// Reverse the most recent set log if it is still inside the undo window.
    ///
    /// Restores the set's values, reopens its exercise, and stops the rest
    /// countdown. The current exercise index is left alone.
    pub fn undo_last_action(&self) -> bool {
        self.apply_and_sync("undo_last_action", |core, _, now| {
            let record = core.undo.take_valid(now)?;
            core.timers.cancel(TimerKind::UndoExpiry);

            let exercise = core.session.exercise_mut(record.exercise_id)?;
            let set_index = exercise.set_index(record.set_id)?;
            let set = &mut exercise.sets[set_index];
            set.weight = record.previous_weight;
            set.reps = record.previous_reps;
            set.completed = record.was_completed;
            set.completed_at = None;
            exercise.refresh_completed();

            core.log.append(
                now,
                SessionEvent::SetUndone {
                    exercise_id: record.exercise_id,
                    set_id: record.set_id,
                },
            );
            core.cancel_rest();
            debug!(exercise_id = %record.exercise_id, set_id = %record.set_id, "Set undone");
            Some(())
        })
        .is_some()
    }

    // ========== Navigation ==========

    /// Bounds-checked move of the current exercise index. Forfeits any
    /// running rest.
    fn navigate(&self, op: &'static str, target: impl FnOnce(&WorkoutSession) -> Option<usize>) -> bool {
        self.apply_and_sync(op, |core, _, _| {
            if !core.session.active {
                return None;
            }
            let index = target(&core.session).filter(|&index| core.session.is_valid_index(index))?;
            core.session.current_exercise_index = index;
            if core.cancel_rest().is_some() {
                debug!(index, "Rest forfeited by navigation");
            }
            Some(())
        })
        .is_some()
    }

    pub fn go_to_exercise(&self, index: usize) -> bool {
        self.navigate("go_to_exercise", |_| Some(index))
    }

    pub fn next_exercise(&self) -> bool {
        self.navigate("next_exercise", |session| {
            session.current_exercise_index.checked_add(1)
        })
    }

    pub fn previous_exercise(&self) -> bool {
        self.navigate("previous_exercise", |session| {
            session.current_exercise_index.checked_sub(1)
        })
    }

    // ========== Rest ==========

    /// Stop the running rest early
    pub fn skip_rest(&self) -> bool {
        self.apply_and_sync("skip_rest", |core, _, now| {
            let rest = core.cancel_rest()?;
            let remaining_secs = rest.remaining_at(now);
            core.log
                .append(now, SessionEvent::RestTimerSkipped { remaining_secs });
            debug!(remaining_secs, "Rest skipped");
            Some(())
        })
        .is_some()
    }

    /// Lengthen (positive) or shorten (negative) the running rest.
    ///
    /// Shortening past zero finishes the rest immediately.
    pub fn adjust_rest(&self, delta_secs: i64) -> bool {
        let warning_secs = self.shared.timer_config.rest_warning_secs;
        self.apply_and_sync("adjust_rest", |core, shared, now| {
            let rest = core.rest.as_mut()?;
            rest.adjust(delta_secs, now, warning_secs);
            debug!(delta_secs, remaining_secs = rest.remaining_secs, "Rest adjusted");
            if rest.remaining_secs == 0 {
                let exercise_id = rest.exercise_id;
                shared.finish_rest(core, exercise_id);
            }
            Some(())
        })
        .is_some()
    }

    // ========== Queries ==========

    pub fn is_active(&self) -> bool {
        self.shared.lock().session.active
    }

    /// Deep copy of the current session
    pub fn snapshot(&self) -> WorkoutSession {
        self.shared.lock().session.clone()
    }

    /// Events logged since the session started, in apply order
    pub fn events(&self) -> Vec<LoggedEvent> {
        self.shared.lock().log.entries().to_vec()
    }

    /// Projection as it would be pushed now
    pub fn projection(&self) -> SessionProjection {
        let core = self.shared.lock();
        let mut projection = core.projection();
        projection.revision = self.shared.sync.revision();
        projection
    }

    pub fn elapsed_time(&self) -> Duration {
        self.shared.lock().elapsed
    }

    /// Whole seconds left on the rest countdown, zero when not resting
    pub fn rest_time_remaining(&self) -> u64 {
        self.shared
            .lock()
            .rest
            .as_ref()
            .map_or(0, |rest| rest.remaining_secs)
    }

    pub fn rest_countdown(&self) -> Option<RestCountdown> {
        self.shared.lock().rest.clone()
    }

    pub fn is_rest_timer_active(&self) -> bool {
        self.shared.lock().rest.is_some()
    }

    /// Whether an undo is pending and still inside its window
    pub fn can_undo(&self) -> bool {
        let now = self.shared.clock.now();
        self.shared.lock().undo.is_available(now)
    }

    pub fn pending_undo(&self) -> Option<UndoRecord> {
        self.shared.lock().undo.pending().cloned()
    }

    pub fn total_sets_completed(&self) -> usize {
        self.shared.lock().session.total_sets_completed()
    }

    /// Whether a timer of `kind` is currently armed
    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.shared.lock().timers.is_armed(kind)
    }

    /// Number of updates handed to the sync adapter so far
    pub fn sync_revision(&self) -> u64 {
        self.shared.sync.revision()
    }

    pub fn subscribe_surface(&self) -> watch::Receiver<SurfaceUpdate> {
        self.shared.sync.subscribe()
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<SessionAlert> {
        self.shared.alerts.subscribe()
    }

    /// Marker of an unfinished session from a previous run, found and
    /// cleared when this controller was built
    pub fn discarded_recovery_marker(&self) -> Option<&RecoveryMarker> {
        self.shared.discarded_marker.as_ref()
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.shared.session_config
    }

    pub fn timer_config(&self) -> &TimerConfig {
        &self.shared.timer_config
    }
}

/// Composition root for a [`SessionController`]
#[derive(Default)]
pub struct SessionControllerBuilder {
    session_config: SessionConfig,
    timer_config: TimerConfig,
    clock: Option<Arc<dyn Clock>>,
    surface: Option<Arc<dyn PresentationSurface>>,
    recovery: Option<Arc<dyn RecoveryStore>>,
}

impl SessionControllerBuilder {
    /// Take session defaults and timer settings from a loaded config
    pub fn config(mut self, config: &Config) -> Self {
        self.session_config = config.session.clone();
        self.timer_config = config.timers.clone();
        self
    }

    pub fn session_config(mut self, session_config: SessionConfig) -> Self {
        self.session_config = session_config;
        self
    }

    pub fn timer_config(mut self, timer_config: TimerConfig) -> Self {
        self.timer_config = timer_config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn surface(mut self, surface: Arc<dyn PresentationSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn recovery(mut self, recovery: Arc<dyn RecoveryStore>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    /// Build the controller on the current Tokio runtime.
    ///
    /// Any recovery marker left by a previous run is discarded here.
    pub fn build(self) -> Result<SessionController> {
        let scheduler = TimerScheduler::current()?;
        let recovery = self
            .recovery
            .unwrap_or_else(|| Arc::new(MemoryRecoveryStore::new()));
        let discarded_marker = discard_stale_marker(recovery.as_ref());
        let surface = self.surface.unwrap_or_else(|| Arc::new(NoopSurface));
        let sync = ExternalSyncAdapter::spawn(surface, scheduler.runtime());

        let shared = Shared {
            core: Mutex::new(SessionCore::new(self.timer_config.undo_window())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            scheduler,
            sync,
            recovery,
            alerts: AlertBus::new(),
            session_config: self.session_config,
            timer_config: self.timer_config,
            discarded_marker,
        };
        debug!("Session controller ready");
        Ok(SessionController {
            shared: Arc::new(shared),
        })
    }
}

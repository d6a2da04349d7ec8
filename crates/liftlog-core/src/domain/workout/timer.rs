//! Timer subsystem: cancellable tick tasks and the rest countdown
//!
//! Three timer kinds run independently. Each is cancel-and-replace: installing
//! a new handle for a kind drops (and aborts) the previous one. Every handle
//! carries a generation number and the tick target must ignore ticks whose
//! generation is no longer installed, so a tick that raced a cancel never
//! applies.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;
use uuid::Uuid;

use super::model::MAX_REST_DURATION;
use crate::error::{Error, Result};

/// Which timer a handle or tick belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Session elapsed-time ticker
    Elapsed,
    /// Rest countdown between sets
    Rest,
    /// One-shot expiry of the undo window
    UndoExpiry,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elapsed => "elapsed",
            Self::Rest => "rest",
            Self::UndoExpiry => "undo_expiry",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether an interval timer keeps running after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// Receiver of timer ticks
pub trait TickTarget: Send + Sync + 'static {
    fn on_tick(&self, kind: TimerKind, generation: u64) -> TickFlow;
}

/// Handle to a running timer task. Dropping it cancels the timer.
pub struct TimerHandle {
    kind: TimerKind,
    generation: u64,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop the timer. No further ticks are delivered for this generation.
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("kind", &self.kind)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Spawns timer tasks on a Tokio runtime
#[derive(Debug, Clone)]
pub struct TimerScheduler {
    runtime: Handle,
}

impl TimerScheduler {
    /// Scheduler bound to the runtime of the calling context
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(|runtime| Self { runtime })
            .map_err(|_| Error::RuntimeUnavailable)
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Tick `target` every `period` (first tick one period from now) until it
    /// answers [`TickFlow::Stop`] or the target is gone.
    pub fn start_interval<T: TickTarget>(
        &self,
        kind: TimerKind,
        generation: u64,
        period: Duration,
        target: Weak<T>,
    ) -> TimerHandle {
        let first_tick = Instant::now() + period;
        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(target) = target.upgrade() else {
                    break;
                };
                if target.on_tick(kind, generation) == TickFlow::Stop {
                    break;
                }
            }
            debug!(timer = %kind, generation, "Timer task finished");
        });
        TimerHandle {
            kind,
            generation,
            task,
        }
    }

    /// Tick `target` once after `delay`
    pub fn start_once<T: TickTarget>(
        &self,
        kind: TimerKind,
        generation: u64,
        delay: Duration,
        target: Weak<T>,
    ) -> TimerHandle {
        let deadline = Instant::now() + delay;
        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(target) = target.upgrade() {
                target.on_tick(kind, generation);
            }
        });
        TimerHandle {
            kind,
            generation,
            task,
        }
    }
}

/// At most one installed handle per timer kind
#[derive(Debug, Default)]
pub struct TimerSlots {
    elapsed: Option<TimerHandle>,
    rest: Option<TimerHandle>,
    undo_expiry: Option<TimerHandle>,
    generation: u64,
}

impl TimerSlots {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<TimerHandle> {
        match kind {
            TimerKind::Elapsed => &mut self.elapsed,
            TimerKind::Rest => &mut self.rest,
            TimerKind::UndoExpiry => &mut self.undo_expiry,
        }
    }

    fn slot(&self, kind: TimerKind) -> &Option<TimerHandle> {
        match kind {
            TimerKind::Elapsed => &self.elapsed,
            TimerKind::Rest => &self.rest,
            TimerKind::UndoExpiry => &self.undo_expiry,
        }
    }

    /// Allocate a generation for the next handle
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Install a handle, cancelling whatever held its slot
    pub fn install(&mut self, handle: TimerHandle) {
        let slot = self.slot_mut(handle.kind);
        if let Some(previous) = slot.replace(handle) {
            debug!(timer = %previous.kind, generation = previous.generation, "Replaced timer");
        }
    }

    /// Cancel the timer of `kind`. Returns true if one was running.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.slot_mut(kind).take().is_some()
    }

    pub fn cancel_all(&mut self) {
        self.elapsed = None;
        self.rest = None;
        self.undo_expiry = None;
    }

    /// Whether `generation` is the live handle for `kind`
    pub fn is_current(&self, kind: TimerKind, generation: u64) -> bool {
        self.slot(kind)
            .as_ref()
            .is_some_and(|handle| handle.generation == generation)
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slot(kind).is_some()
    }
}

/// Outcome of advancing the rest countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestTick {
    Running,
    /// Remaining time just crossed the warning threshold
    NearlyDone,
    Finished,
}

/// Wall-clock rest countdown
///
/// Remaining time is recomputed from the deadline on every tick rather than
/// decremented, so missed ticks never desynchronize it.
#[derive(Debug, Clone, PartialEq)]
pub struct RestCountdown {
    pub exercise_id: Uuid,
    pub total: Duration,
    pub ends_at: DateTime<Utc>,
    pub remaining_secs: u64,
    warned: bool,
}

impl RestCountdown {
    /// Countdown of `duration` (capped at [`MAX_REST_DURATION`]) from `now`
    pub fn start(exercise_id: Uuid, duration: Duration, now: DateTime<Utc>) -> Self {
        let duration = duration.min(MAX_REST_DURATION);
        let ends_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|span| now.checked_add_signed(span))
            .unwrap_or(now);
        Self {
            exercise_id,
            total: duration,
            ends_at,
            remaining_secs: duration.as_secs(),
            warned: false,
        }
    }

    /// Whole seconds left at `now`, rounded up
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.ends_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis as u64).div_ceil(1000)
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>, warning_secs: u64) -> RestTick {
        let previous = self.remaining_secs;
        self.remaining_secs = self.remaining_at(now);

        if self.remaining_secs == 0 {
            RestTick::Finished
        } else if !self.warned && previous > warning_secs && self.remaining_secs <= warning_secs {
            self.warned = true;
            RestTick::NearlyDone
        } else {
            RestTick::Running
        }
    }

    /// Move the deadline by `delta_secs` (negative shortens).
    ///
    /// The shift is clamped so remaining time stays within zero and
    /// [`MAX_REST_DURATION`].
    pub fn adjust(&mut self, delta_secs: i64, now: DateTime<Utc>, warning_secs: u64) {
        let max_secs = MAX_REST_DURATION.as_secs() as i64;
        let remaining = self.remaining_at(now) as i64;
        let delta_secs = delta_secs.clamp(-remaining, max_secs - remaining);

        if let Some(ends_at) = chrono::Duration::try_seconds(delta_secs)
            .and_then(|shift| self.ends_at.checked_add_signed(shift))
        {
            self.ends_at = ends_at;
        }
        let total = (self.total.as_secs() as i64)
            .saturating_add(delta_secs)
            .clamp(0, max_secs);
        self.total = Duration::from_secs(total as u64);
        self.remaining_secs = self.remaining_at(now);
        if self.remaining_secs > warning_secs {
            self.warned = false;
        }
    }

    /// Fraction of the rest already elapsed, in 0.0..=1.0
    pub fn progress(&self) -> f64 {
        let total = self.total.as_secs();
        if total == 0 {
            return 1.0;
        }
        let done = total.saturating_sub(self.remaining_secs);
        (done as f64 / total as f64).clamp(0.0, 1.0)
    }
}

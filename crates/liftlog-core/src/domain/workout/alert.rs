//! Signals for haptic/notification collaborators

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Capacity of the alert channel; slow subscribers lose the oldest alerts
pub const ALERT_CHANNEL_CAPACITY: usize = 32;

/// A moment worth surfacing outside the main view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionAlert {
    /// Rest countdown crossed the warning threshold
    RestNearlyDone { remaining_secs: u64 },
    /// Rest countdown reached zero on its own (not skipped)
    RestFinished { exercise_id: Uuid },
    /// The undo window for a logged set closed
    UndoWindowClosed { set_id: Uuid },
}

/// Fan-out of [`SessionAlert`]s. Sending never blocks and never fails.
#[derive(Debug, Clone)]
pub struct AlertBus {
    tx: broadcast::Sender<SessionAlert>,
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionAlert> {
        self.tx.subscribe()
    }

    pub fn emit(&self, alert: SessionAlert) {
        // No subscribers is fine
        if self.tx.send(alert).is_err() {
            trace!("Alert dropped, no subscribers");
        }
    }
}

//! Crash-recovery marker
//!
//! Detects that a previous run died mid-session. The marker is informational:
//! it is surfaced once and cleared, and the session is not rebuilt from it.

pub mod marker;
pub mod store;

pub use marker::RecoveryMarker;
pub use store::{FileRecoveryStore, MARKER_FILE_NAME, MemoryRecoveryStore, RecoveryStore, discard_stale_marker};

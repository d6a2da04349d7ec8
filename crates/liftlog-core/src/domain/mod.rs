//! Domain layer
//!
//! Contains the workout session engine and crash-recovery bookkeeping.

pub mod recovery;
pub mod workout;

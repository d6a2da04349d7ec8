//! External sync adapter
//!
//! Pushes the latest [`SessionProjection`] to a presentation surface (a
//! lock-screen widget, a terminal status line, ...) without ever blocking the
//! mutation path. The newest value lives in a watch channel and a detached
//! worker forwards it, so at most one update is in flight and a slow surface
//! simply skips intermediate states. Each push carries the full projection,
//! so nothing is lost by skipping.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::projection::SessionProjection;
use crate::error::{Error, Result};

/// What the surface should currently show
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceUpdate {
    /// Nothing pushed yet
    Idle,
    Live(SessionProjection),
    /// Session ended or was cancelled; tear the presentation down
    Ended,
}

/// A display that mirrors session state outside the main application.
///
/// Implementations must tolerate duplicate updates and gaps.
#[async_trait]
pub trait PresentationSurface: Send + Sync {
    async fn update(&self, projection: &SessionProjection) -> Result<()>;

    async fn end(&self) -> Result<()>;
}

/// Fire-and-forget bridge from the controller to a [`PresentationSurface`]
#[derive(Debug)]
pub struct ExternalSyncAdapter {
    tx: watch::Sender<SurfaceUpdate>,
    revision: AtomicU64,
    worker: JoinHandle<()>,
}

impl ExternalSyncAdapter {
    /// Start the forwarding worker on `runtime`
    pub fn spawn(surface: Arc<dyn PresentationSurface>, runtime: &Handle) -> Self {
        let (tx, rx) = watch::channel(SurfaceUpdate::Idle);
        let worker = runtime.spawn(forward_updates(surface, rx));
        Self {
            tx,
            revision: AtomicU64::new(0),
            worker,
        }
    }

    /// Publish a projection. Returns the revision stamped on it.
    pub fn push(&self, mut projection: SessionProjection) -> u64 {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        projection.revision = revision;
        self.tx.send_replace(SurfaceUpdate::Live(projection));
        revision
    }

    /// Ask the surface to tear down its presentation
    pub fn end(&self) -> u64 {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(SurfaceUpdate::Ended);
        revision
    }

    /// Number of pushes so far
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Latest value handed to the surface
    pub fn latest(&self) -> SurfaceUpdate {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SurfaceUpdate> {
        self.tx.subscribe()
    }

    pub fn is_worker_running(&self) -> bool {
        !self.worker.is_finished()
    }
}

async fn forward_updates(surface: Arc<dyn PresentationSurface>, mut rx: watch::Receiver<SurfaceUpdate>) {
    while rx.changed().await.is_ok() {
        let update = rx.borrow_and_update().clone();
        let result = match &update {
            SurfaceUpdate::Live(projection) => surface.update(projection).await,
            SurfaceUpdate::Ended => surface.end().await,
            SurfaceUpdate::Idle => Ok(()),
        };
        if let Err(e) = result {
            warn!(error = %e, code = e.code(), "Presentation surface update failed");
        }
    }
    debug!("Sync worker stopped");
}

/// Surface that ignores every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSurface;

#[async_trait]
impl PresentationSurface for NoopSurface {
    async fn update(&self, _projection: &SessionProjection) -> Result<()> {
        Ok(())
    }

    async fn end(&self) -> Result<()> {
        Ok(())
    }
}

/// Surface that writes each update to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSurface;

#[async_trait]
impl PresentationSurface for LogSurface {
    async fn update(&self, projection: &SessionProjection) -> Result<()> {
        debug!(
            revision = projection.revision,
            exercise = ?projection.exercise_name,
            set = projection.current_set,
            total_sets = projection.total_sets,
            resting = projection.is_resting,
            rest_remaining = projection.rest_remaining_secs,
            elapsed = projection.elapsed_secs,
            "Surface update"
        );
        Ok(())
    }

    async fn end(&self) -> Result<()> {
        info!("Surface presentation ended");
        Ok(())
    }
}

/// Surface that keeps every update it receives in memory.
///
/// Useful for headless runs and tests. A failing recorder returns an error
/// from every call after recording it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    received: Mutex<Vec<SurfaceUpdate>>,
    failing: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn received(&self) -> Vec<SurfaceUpdate> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<SurfaceUpdate> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn record(&self, update: SurfaceUpdate) -> Result<()> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update);
        if self.failing {
            Err(Error::Surface("surface unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PresentationSurface for RecordingSurface {
    async fn update(&self, projection: &SessionProjection) -> Result<()> {
        self.record(SurfaceUpdate::Live(projection.clone()))
    }

    async fn end(&self) -> Result<()> {
        self.record(SurfaceUpdate::Ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn projection(name: &str) -> SessionProjection {
        SessionProjection {
            session_name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_push_reaches_surface() {
        let surface = Arc::new(RecordingSurface::new());
        let adapter = ExternalSyncAdapter::spawn(surface.clone(), &Handle::current());

        let revision = adapter.push(projection("Push Day"));
        assert_eq!(revision, 1);
        settle().await;

        match surface.last() {
            Some(SurfaceUpdate::Live(p)) => {
                assert_eq!(p.session_name, "Push Day");
                assert_eq!(p.revision, 1);
            }
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_burst_is_coalesced_to_latest() {
        let surface = Arc::new(RecordingSurface::new());
        let adapter = ExternalSyncAdapter::spawn(surface.clone(), &Handle::current());

        // No await between pushes: the worker only sees the newest value
        for i in 0..5 {
            adapter.push(projection(&format!("p{}", i)));
        }
        settle().await;

        let received = surface.received();
        assert!(!received.is_empty());
        assert!(received.len() <= 5);
        assert_eq!(
            received.last(),
            Some(&SurfaceUpdate::Live(SessionProjection {
                revision: 5,
                ..projection("p4")
            }))
        );
        assert_eq!(adapter.revision(), 5);
    }

    #[tokio::test]
    async fn test_failing_surface_does_not_stop_worker() {
        let surface = Arc::new(RecordingSurface::failing());
        let adapter = ExternalSyncAdapter::spawn(surface.clone(), &Handle::current());

        adapter.push(projection("a"));
        settle().await;
        adapter.end();
        settle().await;

        assert!(adapter.is_worker_running());
        assert_eq!(surface.last(), Some(SurfaceUpdate::Ended));
        assert_eq!(adapter.latest(), SurfaceUpdate::Ended);
    }

    #[tokio::test]
    async fn test_subscribe_sees_latest() {
        let adapter = ExternalSyncAdapter::spawn(Arc::new(NoopSurface), &Handle::current());
        let rx = adapter.subscribe();
        assert_eq!(*rx.borrow(), SurfaceUpdate::Idle);

        adapter.push(projection("x"));
        assert!(matches!(*rx.borrow(), SurfaceUpdate::Live(_)));
    }
}

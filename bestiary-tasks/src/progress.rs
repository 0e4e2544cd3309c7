//! Progress reporting for mapper jobs.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

/// Snapshot of a running job: `done` of `total` items have settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(done: usize, total: usize) -> Self {
        Self { done, total }
    }

    /// Settled share in `0.0..=1.0`. An empty job counts as finished.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }

    /// Whole-number percentage, rounded down.
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).floor().clamp(0.0, 100.0) as u8
    }

    pub fn is_finished(&self) -> bool {
        self.done >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.done, self.total)
    }
}

/// Receives progress snapshots from a mapper job.
///
/// Called synchronously from inside the job, once before any work starts and
/// once per settled item. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: Progress);
}

/// Sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: Progress) {}
}

/// Adapts a closure into a [`ProgressSink`].
pub struct FnSink<F>(F);

/// Wrap `f` so it can be used as a progress sink.
pub fn progress_fn<F>(f: F) -> FnSink<F>
where
    F: Fn(Progress) + Send + Sync,
{
    FnSink(f)
}

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(Progress) + Send + Sync,
{
    fn report(&self, progress: Progress) {
        (self.0)(progress)
    }
}

/// Latest-value channel; receivers see only the newest snapshot.
impl ProgressSink for watch::Sender<Progress> {
    fn report(&self, progress: Progress) {
        self.send_replace(progress);
    }
}

/// Every snapshot, in order. Reports are dropped once the receiver is gone.
impl ProgressSink for mpsc::UnboundedSender<Progress> {
    fn report(&self, progress: Progress) {
        let _ = self.send(progress);
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    fn report(&self, progress: Progress) {
        (**self).report(progress)
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &S {
    fn report(&self, progress: Progress) {
        (**self).report(progress)
    }
}

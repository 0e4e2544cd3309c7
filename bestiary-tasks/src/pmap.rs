//! Bounded-concurrency async map.
//!
//! A fixed number of workers pull indices from one shared cursor until the
//! input is exhausted. All workers are futures polled by the calling task, so
//! the concurrency limit bounds how many transforms are in flight at once,
//! not how many threads are used.
//!
//! # Failure modes
//!
//! - Fail-fast (default): the first failing item ends the job with
//!   [`MapError::Transform`]. Sibling transforms still in flight are dropped
//!   at that point and report nothing further.
//! - Continue-on-error: failures are kept per index in [`Settled::errors`] and
//!   the job always resolves.
//!
//! # Cancellation
//!
//! Checked by each worker before it claims an item. Items already running
//! finish and keep their result; unclaimed slots stay `None`.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use futures_util::future::{join_all, try_join_all};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use crate::progress::{NoProgress, Progress, ProgressSink};

/// Default number of workers.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// What a cancelled job returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Resolve with whatever settled before cancellation.
    #[default]
    ReturnPartial,
    /// Fail with [`MapError::Cancelled`] if cancellation was seen before any
    /// item settled; otherwise behave like `ReturnPartial`.
    FailIfNothingSettled,
}

/// Mapper settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    /// Requested workers. Clamped to `1..=items.len()`.
    pub concurrency: usize,
    pub continue_on_error: bool,
    pub cancel_policy: CancelPolicy,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            continue_on_error: false,
            cancel_policy: CancelPolicy::default(),
        }
    }
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }

    /// Workers actually started for `total` items.
    pub fn effective_concurrency(&self, total: usize) -> usize {
        self.concurrency.min(total).max(1)
    }
}

/// Why a mapper job failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError<E> {
    /// The transform failed for `items[index]`.
    Transform { index: usize, source: E },
    /// Cancelled before anything settled.
    Cancelled,
}

impl<E> MapError<E> {
    /// Index of the failing item, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Transform { index, .. } => Some(*index),
            Self::Cancelled => None,
        }
    }

    /// The transform's own error, if any.
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Transform { source, .. } => Some(source),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl<E: fmt::Display> fmt::Display for MapError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transform { index, source } => write!(f, "Item {index} failed: {source}"),
            Self::Cancelled => write!(f, "Cancelled before any item settled"),
        }
    }
}

impl<E> std::error::Error for MapError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transform { source, .. } => Some(source),
            Self::Cancelled => None,
        }
    }
}

/// Outcome of a job that resolved.
///
/// `results[i]` and `errors[i]` both refer to `items[i]`; at most one of the
/// two is set. Both are `None` for items never started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled<O, E> {
    pub results: Vec<Option<O>>,
    pub errors: Vec<Option<E>>,
    /// Cancellation was observed before the input ran out.
    pub cancelled: bool,
}

impl<O, E> Settled<O, E> {
    /// Every item produced a value.
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(Option::is_some)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = (usize, &O)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().map(|r| (i, r)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &E)> {
        self.errors
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e)))
    }

    /// The produced values, in input order, skipping failed and unstarted items.
    pub fn into_values(self) -> Vec<O> {
        self.results.into_iter().flatten().collect()
    }
}

/// Runs async transforms over a list with a concurrency limit.
///
/// # Example
///
/// ```ignore
/// let (tx, rx) = tokio::sync::watch::channel(Progress::default());
/// let mapper = ParallelMapper::new(MapConfig::new().with_concurrency(4))
///     .with_progress(tx)
///     .with_cancellation(token.clone());
///
/// let settled = mapper.map(names, |name, _| client.detail(name)).await?;
/// ```
pub struct ParallelMapper {
    config: MapConfig,
    progress: Arc<dyn ProgressSink>,
    cancel: Option<CancellationToken>,
}

impl Default for ParallelMapper {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

impl ParallelMapper {
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NoProgress),
            cancel: None,
        }
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Arc::new(sink);
        self
    }

    pub fn with_progress_arc(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Map every item through `transform`, preserving input order.
    ///
    /// Resolves once every started worker has stopped. See the module docs
    /// for how failures and cancellation shape the result.
    pub async fn map<I, O, E, F, Fut>(
        &self,
        items: Vec<I>,
        transform: F,
    ) -> Result<Settled<O, E>, MapError<E>>
    where
        F: Fn(I, usize) -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        let total = items.len();
        let workers = self.config.effective_concurrency(total);
        let span = info_span!(
            "pmap",
            total,
            concurrency = workers,
            continue_on_error = self.config.continue_on_error
        );

        async move {
            let job = Job::new(items);
            self.progress.report(Progress::new(0, total));
            info!("Starting job");

            let runs = (0..workers).map(|_| self.worker(&job, &transform));
            if self.config.continue_on_error {
                join_all(runs).await;
            } else {
                try_join_all(runs).await.map_err(|e| {
                    debug!(index = ?e.index(), "Job failed, dropping in-flight items");
                    e
                })?;
            }

            let settled_at_cancel = job.cancelled_at.get().copied();
            if settled_at_cancel == Some(0)
                && self.config.cancel_policy == CancelPolicy::FailIfNothingSettled
            {
                info!("Job cancelled before any item settled");
                return Err(MapError::Cancelled);
            }

            let settled = job.finish(settled_at_cancel.is_some());
            info!(
                done = settled.successes().count() + settled.failures().count(),
                failed = settled.failures().count(),
                cancelled = settled.cancelled,
                "Job finished"
            );
            Ok(settled)
        }
        .instrument(span)
        .await
    }

    /// One worker loop: claim, run, store, report, until the input runs out.
    async fn worker<I, O, E, F, Fut>(
        &self,
        job: &Job<I, O, E>,
        transform: &F,
    ) -> Result<(), MapError<E>>
    where
        F: Fn(I, usize) -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        let fail_fast = !self.config.continue_on_error;
        loop {
            if self.is_cancelled() && job.cursor.load(Ordering::SeqCst) < job.total {
                job.mark_cancelled();
                return Ok(());
            }

            let index = job.cursor.fetch_add(1, Ordering::SeqCst);
            let Some(item) = job.claim(index) else {
                return Ok(());
            };

            let outcome = transform(item, index).await;
            let failure = match outcome {
                Ok(value) => {
                    job.store_result(index, value);
                    None
                }
                Err(source) if fail_fast => Some(MapError::Transform { index, source }),
                Err(source) => {
                    debug!(index, "Item failed, continuing");
                    job.store_error(index, source);
                    None
                }
            };

            let done = job.done.fetch_add(1, Ordering::SeqCst) + 1;
            self.progress.report(Progress::new(done, job.total));

            if let Some(err) = failure {
                return Err(err);
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Shared state of one job. Lock guards are never held across an await.
struct Job<I, O, E> {
    total: usize,
    inputs: Mutex<Vec<Option<I>>>,
    results: Mutex<Vec<Option<O>>>,
    errors: Mutex<Vec<Option<E>>>,
    cursor: AtomicUsize,
    done: AtomicUsize,
    /// `done` at the moment cancellation was first observed.
    cancelled_at: OnceLock<usize>,
}

impl<I, O, E> Job<I, O, E> {
    fn new(items: Vec<I>) -> Self {
        let total = items.len();
        Self {
            total,
            inputs: Mutex::new(items.into_iter().map(Some).collect()),
            results: Mutex::new(empty_slots(total)),
            errors: Mutex::new(empty_slots(total)),
            cursor: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            cancelled_at: OnceLock::new(),
        }
    }

    fn claim(&self, index: usize) -> Option<I> {
        let mut inputs = self.inputs.lock().unwrap_or_else(PoisonError::into_inner);
        inputs.get_mut(index).and_then(Option::take)
    }

    fn store_result(&self, index: usize, value: O) {
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        results[index] = Some(value);
    }

    fn store_error(&self, index: usize, error: E) {
        let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        errors[index] = Some(error);
    }

    fn mark_cancelled(&self) {
        let settled = self.done.load(Ordering::SeqCst);
        if self.cancelled_at.set(settled).is_ok() {
            debug!(settled, total = self.total, "Cancellation observed");
        }
    }

    fn finish(self, cancelled: bool) -> Settled<O, E> {
        Settled {
            results: self.results.into_inner().unwrap_or_else(PoisonError::into_inner),
            errors: self.errors.into_inner().unwrap_or_else(PoisonError::into_inner),
            cancelled,
        }
    }
}

fn empty_slots<T>(len: usize) -> Vec<Option<T>> {
    std::iter::repeat_with(|| None).take(len).collect()
}

/// Fail-fast map with `concurrency` workers and no progress or cancellation.
pub async fn pmap<I, O, E, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    transform: F,
) -> Result<Vec<O>, MapError<E>>
where
    F: Fn(I, usize) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let mapper = ParallelMapper::new(MapConfig::new().with_concurrency(concurrency));
    Ok(mapper.map(items, transform).await?.into_values())
}

/// Continue-on-error map: never fails, returns values and errors by index.
pub async fn pmap_settled<I, O, E, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    transform: F,
) -> Settled<O, E>
where
    F: Fn(I, usize) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let config = MapConfig::new()
        .with_concurrency(concurrency)
        .with_continue_on_error(true);
    match ParallelMapper::new(config).map(items, transform).await {
        Ok(settled) => settled,
        // No token and no fail-fast: the mapper has no error path here.
        Err(_) => Settled {
            results: Vec::new(),
            errors: Vec::new(),
            cancelled: true,
        },
    }
}

//! Bestiary Tasks - Async Job Primitives
//!
//! - [`pmap`]: bounded-concurrency ordered map with progress reporting,
//!   cooperative cancellation and fail-fast or continue-on-error handling.
//! - [`debounce`]: a value that commits its input after a quiet period.
//!
//! Neither knows anything about what is being fetched.

pub mod debounce;
pub mod pmap;
pub mod progress;

pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use pmap::{
    pmap, pmap_settled, CancelPolicy, MapConfig, MapError, ParallelMapper, Settled,
    DEFAULT_CONCURRENCY,
};
pub use progress::{progress_fn, FnSink, NoProgress, Progress, ProgressSink};

// Re-exported so callers need not depend on tokio-util directly.
pub use tokio_util::sync::CancellationToken;

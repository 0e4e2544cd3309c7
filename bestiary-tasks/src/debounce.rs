//! Debounced value.
//!
//! Holds back a rapidly changing input (search text, slider position) and
//! commits it as the stable value only once it has stopped changing for a
//! given delay.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// Default settle delay.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

struct State<T> {
    current: T,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

/// A value that follows its input after a quiet period.
///
/// Every change of the input (or of the delay) before the pending commit
/// fires restarts the timer from zero. A zero delay still commits on a later
/// scheduler tick, never inside [`observe`](Self::observe).
///
/// Commits run on spawned Tokio tasks, so `observe` must be called from
/// within a runtime. Dropping the debouncer cancels any pending commit.
pub struct Debouncer<T> {
    state: Mutex<State<T>>,
    stable: Arc<watch::Sender<T>>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Start with `initial` as both input and stable value.
    pub fn new(initial: T) -> Self {
        Self::with_delay(initial, DEFAULT_DEBOUNCE)
    }

    pub fn with_delay(initial: T, delay: Duration) -> Self {
        let (stable, _) = watch::channel(initial.clone());
        Self {
            state: Mutex::new(State {
                current: initial,
                delay,
                pending: None,
            }),
            stable: Arc::new(stable),
        }
    }

    /// Feed the latest input and return the currently committed value.
    pub fn observe(&self, value: T, delay: Duration) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.current != value || state.delay != delay {
            if let Some(pending) = state.pending.take() {
                pending.abort();
            }

            state.current = value.clone();
            state.delay = delay;

            let stable = Arc::clone(&self.stable);
            let deadline = Instant::now() + delay;
            state.pending = Some(tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                trace!(?delay, "Committing debounced value");
                stable.send_replace(value);
            }));
        }

        drop(state);
        self.stable()
    }

    /// [`observe`](Self::observe) with the delay last used.
    pub fn set(&self, value: T) -> T {
        let delay = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .delay;
        self.observe(value, delay)
    }

    /// The last committed value.
    pub fn stable(&self) -> T {
        self.stable.borrow().clone()
    }

    /// The latest input, committed or not.
    pub fn current(&self) -> T {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Whether a commit is still waiting for its delay.
    pub fn is_pending(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Receiver notified on every commit.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.stable.subscribe()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }
}

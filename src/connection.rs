//! Process-wide outbound connection limit.
//!
//! HTTP clients built while a transform is alive size their per-host connection pool from
//! [`connection_limit`]. A transform raises the limit for its lifetime with a
//! [`ConnectionLimitGuard`]; the pre-raise value comes back when the last guard is dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Connection limit in effect when nothing has raised it.
pub const DEFAULT_CONNECTION_LIMIT: usize = 2;

/// Limit requested by the geocoding transforms while they run.
pub const ELEVATED_CONNECTION_LIMIT: usize = 255;

static CONNECTION_LIMIT: AtomicUsize = AtomicUsize::new(DEFAULT_CONNECTION_LIMIT);

/// Live guards and the value in effect before the first of them was taken.
static GUARDS: Mutex<GuardState> = Mutex::new(GuardState {
    live: 0,
    saved: DEFAULT_CONNECTION_LIMIT,
});

struct GuardState {
    live: usize,
    saved: usize,
}

/// Current process-wide connection limit.
pub fn connection_limit() -> usize {
    CONNECTION_LIMIT.load(Ordering::SeqCst)
}

/// Keeps the connection limit raised while alive.
///
/// Guards may overlap: the limit in effect before the first live guard is saved, and it is
/// restored only when the last live guard is dropped.
#[derive(Debug)]
#[must_use = "the previous limit is restored as soon as the guard is dropped"]
pub struct ConnectionLimitGuard {
    previous: usize,
}

impl ConnectionLimitGuard {
    /// Raise the process-wide limit to at least `limit`.
    pub fn raise(limit: usize) -> Self {
        let mut state = GUARDS.lock().unwrap_or_else(PoisonError::into_inner);
        if state.live == 0 {
            state.saved = CONNECTION_LIMIT.load(Ordering::SeqCst);
        }
        state.live += 1;
        let raised = CONNECTION_LIMIT.fetch_max(limit, Ordering::SeqCst).max(limit);
        tracing::debug!(
            previous = state.saved,
            limit = raised,
            live = state.live,
            "raised connection limit"
        );
        Self {
            previous: state.saved,
        }
    }

    /// The value that will be restored once no guard is left.
    pub fn previous(&self) -> usize {
        self.previous
    }
}

impl Drop for ConnectionLimitGuard {
    fn drop(&mut self) {
        let mut state = GUARDS.lock().unwrap_or_else(PoisonError::into_inner);
        state.live = state.live.saturating_sub(1);
        if state.live == 0 {
            CONNECTION_LIMIT.store(state.saved, Ordering::SeqCst);
            tracing::debug!(limit = state.saved, "restored connection limit");
        }
    }
}

//! Sliding-window admission control shared by all workers of a transform.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{TransformError, TransformResult};

/// Bounds how many callers may proceed within any trailing time window.
///
/// Callers are admitted strictly in arrival order: each caller draws a ticket and only the
/// holder of the next ticket may be admitted, so a late caller can never overtake a waiting one.
#[derive(Debug)]
pub struct RateGate {
    limit: usize,
    window: Duration,
    state: Mutex<GateState>,
    cv: Condvar,
}

#[derive(Debug, Default)]
struct GateState {
    admitted: VecDeque<Instant>,
    next_ticket: u64,
    now_serving: u64,
    closed: bool,
}

impl GateState {
    fn expire(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.admitted.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateGate {
    /// Create a gate admitting at most `limit` callers per `window`.
    pub fn new(limit: u32, window: Duration) -> TransformResult<Self> {
        if limit == 0 {
            return Err(TransformError::configuration(
                "rate limit must be a positive number of calls",
            ));
        }
        if window.is_zero() {
            return Err(TransformError::configuration(
                "rate limit time window must be positive",
            ));
        }

        Ok(Self {
            limit: limit as usize,
            window,
            state: Mutex::new(GateState {
                admitted: VecDeque::with_capacity(limit as usize),
                ..GateState::default()
            }),
            cv: Condvar::new(),
        })
    }

    /// Maximum admissions per window.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Length of the trailing window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Block until the caller may proceed.
    ///
    /// Returns the time spent waiting (zero if no wait was required), or
    /// [`TransformError::RateGateClosed`] if the gate is closed before admission.
    pub fn wait_to_proceed(&self) -> TransformResult<Duration> {
        let start = Instant::now();
        let mut waited = false;
        let mut state = self.lock();
        if state.closed {
            return Err(TransformError::RateGateClosed);
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;

        loop {
            if state.closed {
                return Err(TransformError::RateGateClosed);
            }

            if state.now_serving != ticket {
                waited = true;
                state = self.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
                continue;
            }

            let now = Instant::now();
            state.expire(now, self.window);
            if state.admitted.len() < self.limit {
                state.admitted.push_back(now);
                state.now_serving += 1;
                drop(state);
                self.cv.notify_all();
                return Ok(if waited { start.elapsed() } else { Duration::ZERO });
            }

            // Full window: sleep until the oldest admission ages out.
            let wake_in = state
                .admitted
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            waited = true;
            state = self
                .cv
                .wait_timeout(state, wake_in)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Close the gate. Every waiting and future caller receives
    /// [`TransformError::RateGateClosed`].
    pub fn close(&self) {
        self.lock().closed = true;
        self.cv.notify_all();
    }

    /// Whether [`RateGate::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RateGate {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::RateGate;
    use crate::error::TransformError;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    #[test]
    fn rejects_non_positive_configuration() {
        let err = RateGate::new(0, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfiguration { .. }));

        let err = RateGate::new(5, Duration::ZERO).unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfiguration { .. }));
    }

    #[test]
    fn admits_up_to_limit_without_waiting() {
        let gate = RateGate::new(3, Duration::from_secs(60)).unwrap();
        for _ in 0..3 {
            assert_eq!(gate.wait_to_proceed().unwrap(), Duration::ZERO);
        }
    }

    #[test]
    fn concurrent_callers_never_exceed_limit_per_window() {
        let window = Duration::from_millis(100);
        let gate = Arc::new(RateGate::new(2, window).unwrap());
        let admitted = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    gate.wait_to_proceed().unwrap();
                    admitted.lock().unwrap().push(Instant::now());
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Six admissions at two per window need at least two full windows after the first.
        let mut times = admitted.lock().unwrap().clone();
        assert_eq!(times.len(), 6);
        assert!(start.elapsed() >= window * 2);

        // No window of length W ever holds more than two admissions.
        times.sort();
        let tolerance = Duration::from_millis(15);
        for i in 2..times.len() {
            let gap = times[i] - times[i - 2];
            assert!(
                gap + tolerance >= window,
                "admissions {} and {i} only {gap:?} apart",
                i - 2
            );
        }
    }

    #[test]
    fn admission_reopens_after_window_elapses() {
        let window = Duration::from_millis(50);
        let gate = RateGate::new(1, window).unwrap();
        gate.wait_to_proceed().unwrap();

        let waited = gate.wait_to_proceed().unwrap();
        assert!(waited > Duration::ZERO);
        assert!(waited <= window * 4);
    }

    #[test]
    fn close_releases_blocked_waiters_with_error() {
        let gate = Arc::new(RateGate::new(1, Duration::from_secs(60)).unwrap());
        gate.wait_to_proceed().unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || gate.wait_to_proceed())
        };
        std::thread::sleep(Duration::from_millis(50));
        gate.close();

        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(TransformError::RateGateClosed)));
        assert!(gate.is_closed());
        assert!(matches!(
            gate.wait_to_proceed(),
            Err(TransformError::RateGateClosed)
        ));
    }
}

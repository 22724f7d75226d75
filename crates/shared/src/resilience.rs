use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Externally visible breaker state, reported by `/healthz/db`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}

#[derive(Debug)]
enum State {
    /// Normal operation; counts the current run of consecutive failures.
    Closed { failures: u32 },
    /// Failing fast; no calls go through until the cooldown elapses.
    Open { since: Instant },
    /// Cooldown elapsed; exactly one probe call is allowed through.
    HalfOpen { probing: bool },
}

/// Circuit breaker guarding database access.
///
/// Trips open after `failure_threshold` consecutive failures. While open,
/// `try_acquire` denies every call until `cooldown` has elapsed, then admits
/// a single probe: its success closes the circuit, its failure starts a
/// fresh cooldown.
pub struct CircuitBreaker {
    inner: Mutex<State>,
    failure_threshold: u32,
    cooldown: Duration,
}

const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }

    pub fn with_settings(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(State::Closed { failures: 0 }),
            failure_threshold,
            cooldown,
        }
    }

    /// Ask permission to make a call. Callers that receive `true` must report
    /// the outcome via `record_success` or `record_failure`.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.inner.lock().unwrap();
        match *state {
            State::Closed { .. } => true,
            State::Open { since } => {
                if since.elapsed() >= self.cooldown {
                    // This caller becomes the half-open probe
                    *state = State::HalfOpen { probing: true };
                    true
                } else {
                    false
                }
            }
            State::HalfOpen { probing } => {
                if probing {
                    false
                } else {
                    *state = State::HalfOpen { probing: true };
                    true
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.inner.lock().unwrap();
        match *state {
            State::Closed { .. } | State::HalfOpen { .. } => {
                *state = State::Closed { failures: 0 };
            }
            // A straggler from before the trip; the cooldown still applies
            State::Open { .. } => {}
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.inner.lock().unwrap();
        match *state {
            State::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.failure_threshold {
                    *state = State::Open {
                        since: Instant::now(),
                    };
                } else {
                    *state = State::Closed { failures };
                }
            }
            State::HalfOpen { .. } => {
                *state = State::Open {
                    since: Instant::now(),
                };
            }
            State::Open { .. } => {}
        }
    }

    pub fn state(&self) -> BreakerState {
        match *self.inner.lock().unwrap() {
            State::Closed { .. } => BreakerState::Closed,
            State::Open { .. } => BreakerState::Open,
            State::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_breaker() -> CircuitBreaker {
        CircuitBreaker::with_settings(3, Duration::from_secs(30))
    }

    #[test]
    fn test_starts_closed() {
        let breaker = quick_breaker();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.try_acquire());
    }

    #[test]
    fn test_success_resets_failure_run() {
        let breaker = quick_breaker();
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        // Never three in a row, so still closed
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_open_after_consecutive_failures() {
        let breaker = quick_breaker();
        for _ in 0..3 {
            assert!(breaker.try_acquire());
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_cooldown_single_probe() {
        let breaker = quick_breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert!(!breaker.try_acquire());

        tokio::time::advance(Duration::from_secs(31)).await;

        // First caller becomes the probe, second is still denied
        assert!(breaker.try_acquire());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(!breaker.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_success_closes() {
        let breaker = quick_breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(breaker.try_acquire());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_reopens_with_fresh_cooldown() {
        let breaker = quick_breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(breaker.try_acquire());
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);

        // Cooldown restarted: still denied shortly after
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!breaker.try_acquire());

        tokio::time::advance(Duration::from_secs(21)).await;
        assert!(breaker.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_while_open_is_ignored() {
        let breaker = quick_breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}

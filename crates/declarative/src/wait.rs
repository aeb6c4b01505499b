//! Polling with backoff until a probe reports readiness.
//!
//! [`wait_until`] drives a probe closure under a [`WaitPolicy`]: each probe
//! either finishes the wait ([`Poll::Ready`]), asks for another round
//! ([`Poll::Pending`] with a short status text), or fails, which aborts the
//! wait without further probes. Sleeps between probes happen on a
//! [`Cancellation`] so a cancel wakes the waiter immediately.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// The awaited condition holds.
    Ready(T),
    /// Not there yet; carries the observed status for diagnostics.
    Pending(String),
}

/// Deadline and pacing of a wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    /// Total time allowed before giving up.
    pub timeout: Duration,
    /// Delay before the second probe.
    pub interval: Duration,
    /// Factor applied to the delay after each pending probe.
    pub backoff_factor: f64,
    /// Upper bound for the delay between probes.
    pub max_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            interval: Duration::from_secs(2),
            backoff_factor: 1.5,
            max_interval: Duration::from_secs(10),
        }
    }
}

impl WaitPolicy {
    /// Default pacing with the given deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Fixed interval, no backoff. Mostly useful in tests.
    pub fn fixed(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            backoff_factor: 1.0,
            max_interval: interval,
        }
    }

    /// Delay after the given number of pending probes (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(attempt as i32);
        let secs = (self.interval.as_secs_f64() * factor).min(self.max_interval.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_interval)
    }
}

/// Why a wait did not finish.
#[derive(Debug, thiserror::Error)]
pub enum WaitError<E> {
    /// The deadline passed while the probe was still pending.
    #[error("timed out after {elapsed:?} (last status: {last_status})")]
    Timeout {
        elapsed: Duration,
        last_status: String,
    },

    /// The cancellation token fired.
    #[error("cancelled")]
    Cancelled,

    /// The probe failed.
    #[error("{0}")]
    Failed(E),
}

/// Shared cancellation flag that wakes sleeping waiters.
///
/// Clones observe the same flag.
#[derive(Clone, Default)]
pub struct Cancellation {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Cancellation {
    /// New, not yet cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and wake every waiter.
    pub fn cancel(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        condvar.notify_all();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `duration` unless cancelled first. Returns `true` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = condvar
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellation")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Probe until ready, failed, cancelled or past the deadline.
///
/// The first probe runs immediately. A pending probe past the deadline ends
/// the wait with [`WaitError::Timeout`]; otherwise the waiter sleeps for the
/// next backoff delay, never beyond the deadline, and probes again.
pub fn wait_until<T, E, F>(
    policy: &WaitPolicy,
    cancel: &Cancellation,
    mut probe: F,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Result<Poll<T>, E>,
{
    let started = Instant::now();
    // An unrepresentable deadline means the wait never times out
    let deadline = started.checked_add(policy.timeout);
    let mut attempt = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }

        let status = match probe().map_err(WaitError::Failed)? {
            Poll::Ready(value) => return Ok(value),
            Poll::Pending(status) => status,
        };

        let now = Instant::now();
        let mut delay = policy.delay_for_attempt(attempt);
        if let Some(deadline) = deadline {
            if now >= deadline {
                return Err(WaitError::Timeout {
                    elapsed: now - started,
                    last_status: status,
                });
            }
            delay = delay.min(deadline - now);
        }
        log::debug!(
            "still {status} after {:.1}s, next check in {:.1}s",
            (now - started).as_secs_f64(),
            delay.as_secs_f64()
        );
        if cancel.sleep(delay) {
            return Err(WaitError::Cancelled);
        }
        attempt = attempt.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::thread;

    fn quick(timeout_ms: u64) -> WaitPolicy {
        WaitPolicy::fixed(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_ready_on_first_probe() {
        let probes = Cell::new(0);
        let result: Result<u32, WaitError<String>> =
            wait_until(&quick(1000), &Cancellation::new(), || {
                probes.set(probes.get() + 1);
                Ok(Poll::Ready(7))
            });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(probes.get(), 1);
    }

    #[test]
    fn test_pending_then_ready_counts_probes() {
        let statuses = ["Deploying", "Deploying", "Running"];
        let probes = Cell::new(0usize);

        let result: Result<(), WaitError<String>> =
            wait_until(&quick(5000), &Cancellation::new(), || {
                let status = statuses[probes.get()];
                probes.set(probes.get() + 1);
                if status == "Running" {
                    Ok(Poll::Ready(()))
                } else {
                    Ok(Poll::Pending(status.to_string()))
                }
            });

        assert!(result.is_ok());
        assert_eq!(probes.get(), 3);
    }

    #[test]
    fn test_failure_stops_probing() {
        let probes = Cell::new(0);
        let result: Result<(), WaitError<String>> =
            wait_until(&quick(5000), &Cancellation::new(), || {
                probes.set(probes.get() + 1);
                if probes.get() == 2 {
                    Err("image pull failed".to_string())
                } else {
                    Ok(Poll::Pending("Deploying".to_string()))
                }
            });

        match result {
            Err(WaitError::Failed(message)) => assert_eq!(message, "image pull failed"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(probes.get(), 2);
    }

    #[test]
    fn test_timeout_reports_last_status() {
        let result: Result<(), WaitError<String>> =
            wait_until(&quick(30), &Cancellation::new(), || {
                Ok(Poll::Pending("Deploying".to_string()))
            });

        match result {
            Err(WaitError::Timeout { last_status, elapsed }) => {
                assert_eq!(last_status, "Deploying");
                assert!(elapsed >= Duration::from_millis(30));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_before_start() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let probes = Cell::new(0);

        let result: Result<(), WaitError<String>> = wait_until(&quick(1000), &cancel, || {
            probes.set(probes.get() + 1);
            Ok(Poll::Ready(()))
        });

        assert!(matches!(result, Err(WaitError::Cancelled)));
        assert_eq!(probes.get(), 0);
    }

    #[test]
    fn test_cancel_wakes_sleeping_waiter() {
        let cancel = Cancellation::new();
        let policy = WaitPolicy::fixed(Duration::from_secs(60), Duration::from_secs(30));

        let trigger = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.cancel();
        });

        let started = Instant::now();
        let result: Result<(), WaitError<String>> = wait_until(&policy, &cancel, || {
            Ok(Poll::Pending("Deploying".to_string()))
        });
        handle.join().unwrap();

        assert!(matches!(result, Err(WaitError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_huge_timeout_does_not_overflow() {
        let policy = WaitPolicy {
            interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(1),
            ..WaitPolicy::with_timeout(Duration::from_secs(u64::MAX))
        };
        let probes = Cell::new(0);

        let result: Result<(), WaitError<String>> =
            wait_until(&policy, &Cancellation::new(), || {
                probes.set(probes.get() + 1);
                if probes.get() < 3 {
                    Ok(Poll::Pending("Deploying".to_string()))
                } else {
                    Ok(Poll::Ready(()))
                }
            });

        assert!(result.is_ok());
        assert_eq!(probes.get(), 3);
    }

    #[test]
    fn test_delay_backoff_is_capped() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(10));
    }

    #[test]
    fn test_sleep_without_cancel_returns_false() {
        let cancel = Cancellation::new();
        assert!(!cancel.sleep(Duration::from_millis(1)));
        assert!(!cancel.is_cancelled());
    }
}

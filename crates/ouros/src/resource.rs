//! Compute-budget accounting and the clock-pause/resume wrapper around I/O.
//!
//! The evaluator charges nanoseconds of wall-clock time against a budget on
//! every statement-loop iteration and loop body-entry (spec.md §4.6). I/O
//! performed through a capability (`Context::open_handle` and friends) is
//! wrapped in [`ResourceTracker::pause`]/[`ResourceTracker::resume`] so that
//! network or disk latency never counts against the budget — only the
//! program's own compute does.

use std::time::{Duration, Instant};

use crate::exception::{Exception, ExcType};

/// Default maximum call-stack depth before a `RecursionError`.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Threaded through `Context` to track and enforce compute limits.
///
/// `NoLimitTracker` is the zero-overhead default (matches the teacher's own
/// naming and its use for REPL/benchmark sessions); `LimitedTracker` is what
/// a sandboxed run against untrusted code should use.
pub trait ResourceTracker {
    /// Charges `elapsed` compute time. Returns an error if the cumulative
    /// total now exceeds the configured deadline.
    fn charge(&mut self, elapsed: Duration) -> Result<(), ResourceError>;

    /// Marks the start of an I/O wait; compute time stops accruing until
    /// the matching `resume`.
    fn pause(&mut self) {}

    /// Marks the end of an I/O wait.
    fn resume(&mut self) {}

    /// Cumulative compute time charged so far, excluding paused intervals.
    fn elapsed(&self) -> Duration;
}

/// A tracker with no limits: compute time is still recorded (for
/// telemetry) but never rejected.
#[derive(Debug, Clone, Default)]
pub struct NoLimitTracker {
    total: Duration,
}

impl ResourceTracker for NoLimitTracker {
    fn charge(&mut self, elapsed: Duration) -> Result<(), ResourceError> {
        self.total += elapsed;
        Ok(())
    }

    fn elapsed(&self) -> Duration {
        self.total
    }
}

/// A tracker enforcing a wall-clock compute deadline.
#[derive(Debug, Clone)]
pub struct LimitedTracker {
    budget: Duration,
    total: Duration,
    paused: bool,
    pause_started: Option<Instant>,
}

impl LimitedTracker {
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            total: Duration::ZERO,
            paused: false,
            pause_started: None,
        }
    }
}

impl ResourceTracker for LimitedTracker {
    fn charge(&mut self, elapsed: Duration) -> Result<(), ResourceError> {
        if self.paused {
            return Ok(());
        }
        self.total += elapsed;
        if self.total > self.budget {
            return Err(ResourceError::Time {
                limit: self.budget,
                elapsed: self.total,
            });
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
        self.pause_started = Some(Instant::now());
    }

    fn resume(&mut self) {
        self.paused = false;
        self.pause_started = None;
    }

    fn elapsed(&self) -> Duration {
        self.total
    }
}

/// Error returned when a resource limit is exceeded during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    Time { limit: Duration, elapsed: Duration },
    Recursion { limit: usize, depth: usize },
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceError::Time { limit, elapsed } => {
                write!(f, "time limit exceeded: {elapsed:?} > {limit:?}")
            }
            ResourceError::Recursion { limit, .. } => {
                write!(f, "maximum recursion depth {limit} exceeded")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

impl ResourceError {
    /// Converts this resource error to the Python exception the evaluator
    /// raises, per spec.md §4.6/§7: `TimeoutError` and `RecursionError`
    /// both bypass user `except` clauses.
    #[must_use]
    pub fn to_exception(&self) -> Exception {
        match self {
            ResourceError::Time { .. } => Exception::new(ExcType::TimeoutError, self.to_string()),
            ResourceError::Recursion { .. } => Exception::new(ExcType::RecursionError, self.to_string()),
        }
    }
}

/// Resource limits configured for a run, collected into one place the way
/// the teacher's `ResourceLimits` bundles allocation/time/recursion caps.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    pub deadline: Option<Duration>,
    pub max_recursion_depth: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            deadline: None,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limited_tracker_rejects_once_over_budget() {
        let mut tracker = LimitedTracker::new(Duration::from_millis(10));
        assert!(tracker.charge(Duration::from_millis(5)).is_ok());
        assert!(tracker.charge(Duration::from_millis(20)).is_err());
    }

    #[test]
    fn paused_time_is_not_charged() {
        let mut tracker = LimitedTracker::new(Duration::from_millis(1));
        tracker.pause();
        assert!(tracker.charge(Duration::from_secs(10)).is_ok());
        tracker.resume();
        assert!(tracker.charge(Duration::from_millis(2)).is_err());
    }
}

//! # Fibonacci Backoff
//!
//! Progressive retry delays for requests whose reconciliation keeps failing.
//! Values are tracked in minutes and handed out in seconds:
//! 1m, 1m, 2m, 3m, 5m, 8m, then capped at the configured maximum.
//!
//! ```rust
//! use certificate_request_controller::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(1, 10);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 120);
//! ```

use std::time::Duration;

/// Fibonacci retry delay generator
///
/// Each call to [`FibonacciBackoff::next_backoff_seconds`] returns the current
/// delay and advances to the sum of the two previous ones, never exceeding the
/// configured maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min_minutes` and capped at `max_minutes`
    ///
    /// A zero minimum is raised to one minute so the sequence always grows.
    /// A maximum below the minimum is raised to the minimum.
    ///
    /// # Arguments
    /// * `min_minutes` - First delay in minutes
    /// * `max_minutes` - Upper bound for every delay in minutes
    ///
    /// # Example
    /// ```rust
    /// use certificate_request_controller::controller::backoff::FibonacciBackoff;
    ///
    /// let mut backoff = FibonacciBackoff::new(0, 0);
    /// assert_eq!(backoff.next_backoff_seconds(), 60);
    /// assert_eq!(backoff.next_backoff_seconds(), 60);
    /// ```
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        let min_minutes = min_minutes.max(1);
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes: max_minutes.max(min_minutes),
        }
    }

    /// Current delay in seconds; advances the sequence
    ///
    /// # Returns
    /// The delay to wait before the next attempt, saturating instead of overflowing.
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_minutes.saturating_mul(60);

        let next_minutes = self.prev_minutes.saturating_add(self.current_minutes);
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next_minutes.min(self.max_minutes);

        result_seconds
    }

    /// Same as [`FibonacciBackoff::next_backoff_seconds`], as a [`Duration`]
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Restart the sequence from the minimum
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

/// Per-request retry state kept by the error policy
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    /// Consecutive failed reconciliations
    pub error_count: u32,
}

impl BackoffState {
    /// Fresh state with no recorded errors
    ///
    /// # Arguments
    /// * `min_minutes` - First retry delay in minutes
    /// * `max_minutes` - Cap on the retry delay in minutes
    ///
    /// # Example
    /// ```rust
    /// use certificate_request_controller::controller::backoff::BackoffState;
    ///
    /// let mut state = BackoffState::new(1, 10);
    /// state.increment_error();
    /// assert_eq!(state.error_count, 1);
    /// assert_eq!(state.backoff.next_backoff_seconds(), 60);
    /// ```
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
        }
    }

    /// Record one more failed reconciliation
    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    /// Clear the error count and restart the delay sequence
    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

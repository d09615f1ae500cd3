//! Testing utilities for code that retries.
//!
//! # Examples
//!
//! ```rust
//! use retrier::testing::RecordingLogger;
//! use retrier::{retry, assert_retry_failure, RetryConfig};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let logger = RecordingLogger::new();
//! let config = RetryConfig::default().with_initial_duration(Duration::from_millis(1));
//!
//! let result = retry(&CancellationToken::new(), &logger, &config, || async {
//!     Err::<(), _>("unclassified".to_string())
//! })
//! .await;
//!
//! assert_retry_failure!(result, 1);
//! assert_eq!(logger.len(), 1);
//! # });
//! ```

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::logger::{AttemptOutcome, DebugLogger, RetryEvent};
use crate::policy::RetryPolicy;

/// An owned copy of a [`RetryEvent`], with the error rendered to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Which attempt finished.
    pub attempt: u32,
    /// The configured attempt budget.
    pub max_attempts: u32,
    /// Scheduled delay, zero for terminal events.
    pub backoff: Duration,
    /// What the loop decided.
    pub outcome: AttemptOutcome,
    /// How the error was classified.
    pub policy: Option<RetryPolicy>,
    /// The error's `Display` output.
    pub error: Option<String>,
}

/// Logger that keeps every event it receives.
///
/// Safe to share between tasks; events from concurrent runs interleave.
#[derive(Debug)]
pub struct RecordingLogger {
    enabled: bool,
    events: Mutex<Vec<RecordedEvent>>,
}

impl Default for RecordingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingLogger {
    /// Create an enabled recorder.
    pub fn new() -> Self {
        Self {
            enabled: true,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Create a recorder that reports itself disabled, so it should never
    /// receive events.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    /// Delays of the `Retrying` events, in order.
    pub fn backoffs(&self) -> Vec<Duration> {
        self.lock()
            .iter()
            .filter(|e| e.outcome == AttemptOutcome::Retrying)
            .map(|e| e.backoff)
            .collect()
    }

    /// The most recent event.
    pub fn last(&self) -> Option<RecordedEvent> {
        self.lock().last().cloned()
    }

    /// Number of events recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget all recorded events.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: fmt::Display + ?Sized> DebugLogger<E> for RecordingLogger {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn log_retry(&self, event: &RetryEvent<'_, E>) {
        self.lock().push(RecordedEvent {
            attempt: event.attempt,
            max_attempts: event.max_attempts,
            backoff: event.backoff,
            outcome: event.outcome,
            policy: event.policy,
            error: event.error.map(ToString::to_string),
        });
    }
}

/// Assert that a retry run succeeded, optionally after an exact number of
/// attempts.
///
/// # Example
///
/// ```rust
/// use retrier::{assert_retry_success, RetryResult};
///
/// let result = RetryResult::<_, String>::success(42, 2);
/// assert_retry_success!(result);
/// assert_retry_success!(result, 2);
/// ```
#[macro_export]
macro_rules! assert_retry_success {
    ($result:expr) => {
        match &$result {
            $crate::RetryResult::Success { .. } => {}
            $crate::RetryResult::Failure { error, attempts } => {
                panic!(
                    "Expected Success, got Failure after {} attempts: {:?}",
                    attempts, error
                );
            }
        }
    };
    ($result:expr, $attempts:expr) => {
        match &$result {
            $crate::RetryResult::Success { attempts, .. } => {
                assert_eq!(*attempts, $attempts, "unexpected attempt count");
            }
            $crate::RetryResult::Failure { error, attempts } => {
                panic!(
                    "Expected Success, got Failure after {} attempts: {:?}",
                    attempts, error
                );
            }
        }
    };
}

/// Assert that a retry run failed, optionally after an exact number of
/// attempts.
///
/// # Example
///
/// ```rust
/// use retrier::{assert_retry_failure, RetryFailure, RetryResult};
///
/// let result = RetryResult::<i32, _>::failure(RetryFailure::Operation("bad"), 1);
/// assert_retry_failure!(result);
/// assert_retry_failure!(result, 1);
/// ```
#[macro_export]
macro_rules! assert_retry_failure {
    ($result:expr) => {
        match &$result {
            $crate::RetryResult::Failure { .. } => {}
            $crate::RetryResult::Success { value, attempts } => {
                panic!(
                    "Expected Failure, got Success after {} attempts: {:?}",
                    attempts, value
                );
            }
        }
    };
    ($result:expr, $attempts:expr) => {
        match &$result {
            $crate::RetryResult::Failure { attempts, .. } => {
                assert_eq!(*attempts, $attempts, "unexpected attempt count");
            }
            $crate::RetryResult::Success { value, attempts } => {
                panic!(
                    "Expected Failure, got Success after {} attempts: {:?}",
                    attempts, value
                );
            }
        }
    };
}

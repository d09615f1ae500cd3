//! Observers notified as a retry run progresses.
//!
//! The retry loop reports every attempt outcome through a [`DebugLogger`]. A
//! terminal event always carries a zero backoff; a retry event carries the
//! delay the loop is about to wait.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::policy::RetryPolicy;

/// What the retry loop decided after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
    /// The attempt succeeded.
    Succeeded,
    /// The attempt failed and another one is scheduled.
    Retrying,
    /// The error asked for a caller decision. The loop stopped.
    ManualStop,
    /// The error is permanent. The loop stopped.
    PermanentStop,
    /// The attempt budget ran out.
    Exhausted,
}

impl AttemptOutcome {
    /// Returns true for every outcome that ends the run.
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptOutcome::Retrying)
    }

    /// Short snake_case label, used in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Succeeded => "succeeded",
            AttemptOutcome::Retrying => "retrying",
            AttemptOutcome::ManualStop => "manual_stop",
            AttemptOutcome::PermanentStop => "permanent_stop",
            AttemptOutcome::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Information about one attempt, passed to a [`DebugLogger`].
#[derive(Debug)]
pub struct RetryEvent<'a, E: ?Sized> {
    /// Which attempt just finished (1-indexed).
    pub attempt: u32,
    /// The configured attempt budget.
    pub max_attempts: u32,
    /// Delay before the next attempt. Zero for terminal events.
    pub backoff: Duration,
    /// The error from the attempt, `None` on success.
    pub error: Option<&'a E>,
    /// What the loop decided.
    pub outcome: AttemptOutcome,
    /// How the error was classified, `None` on success.
    pub policy: Option<RetryPolicy>,
    /// Time since the first attempt started.
    pub elapsed: Duration,
}

impl<E: ?Sized> RetryEvent<'_, E> {
    /// Returns true if no further attempt follows this event.
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_terminal()
    }
}

/// Observer for retry progress.
///
/// `enabled` is checked before every notification, so implementations can
/// skip formatting entirely when nobody is listening.
pub trait DebugLogger<E: ?Sized> {
    /// Returns true if [`log_retry`](DebugLogger::log_retry) should be called.
    fn enabled(&self) -> bool;

    /// Record one attempt outcome.
    fn log_retry(&self, event: &RetryEvent<'_, E>);
}

impl<E: ?Sized, L: DebugLogger<E> + ?Sized> DebugLogger<E> for &L {
    fn enabled(&self) -> bool {
        (**self).enabled()
    }

    fn log_retry(&self, event: &RetryEvent<'_, E>) {
        (**self).log_retry(event)
    }
}

impl<E: ?Sized, L: DebugLogger<E> + ?Sized> DebugLogger<E> for Arc<L> {
    fn enabled(&self) -> bool {
        (**self).enabled()
    }

    fn log_retry(&self, event: &RetryEvent<'_, E>) {
        (**self).log_retry(event)
    }
}

impl<E: ?Sized, L: DebugLogger<E> + ?Sized> DebugLogger<E> for Box<L> {
    fn enabled(&self) -> bool {
        (**self).enabled()
    }

    fn log_retry(&self, event: &RetryEvent<'_, E>) {
        (**self).log_retry(event)
    }
}

/// Logger that discards everything. Used when no observer is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpLogger;

impl NoOpLogger {
    /// Create a new NoOpLogger.
    pub fn new() -> Self {
        NoOpLogger
    }
}

impl<E: ?Sized> DebugLogger<E> for NoOpLogger {
    fn enabled(&self) -> bool {
        false
    }

    fn log_retry(&self, _event: &RetryEvent<'_, E>) {}
}

/// Logger backed by a closure. Created by [`fn_logger`].
#[derive(Clone)]
pub struct FnLogger<F> {
    f: F,
}

impl<F> fmt::Debug for FnLogger<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLogger").finish_non_exhaustive()
    }
}

/// Wrap a closure as a [`DebugLogger`]. The logger is always enabled.
///
/// # Examples
///
/// ```rust
/// use retrier::{fn_logger, DebugLogger, RetryEvent};
///
/// let logger = fn_logger(|event: &RetryEvent<'_, String>| {
///     println!("attempt {} -> {}", event.attempt, event.outcome);
/// });
/// assert!(DebugLogger::<String>::enabled(&logger));
/// ```
pub fn fn_logger<E, F>(f: F) -> FnLogger<F>
where
    E: ?Sized,
    F: Fn(&RetryEvent<'_, E>),
{
    FnLogger { f }
}

impl<E, F> DebugLogger<E> for FnLogger<F>
where
    E: ?Sized,
    F: Fn(&RetryEvent<'_, E>),
{
    fn enabled(&self) -> bool {
        true
    }

    fn log_retry(&self, event: &RetryEvent<'_, E>) {
        (self.f)(event)
    }
}

/// Logger that emits `tracing` events.
///
/// Retries and successes are logged at `DEBUG`, manual stops at `INFO`, and
/// permanent or exhausted failures at `WARN`.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracingLogger;

#[cfg(feature = "tracing")]
impl TracingLogger {
    /// Create a new TracingLogger.
    pub fn new() -> Self {
        TracingLogger
    }
}

/// Renders an optional error, writing nothing for `None`.
#[cfg(feature = "tracing")]
struct OptionalError<'a, E: ?Sized>(Option<&'a E>);

#[cfg(feature = "tracing")]
impl<E: fmt::Display + ?Sized> fmt::Display for OptionalError<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(err) => err.fmt(f),
            None => Ok(()),
        }
    }
}

#[cfg(feature = "tracing")]
impl<E: fmt::Display + ?Sized> DebugLogger<E> for TracingLogger {
    fn enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::WARN)
    }

    fn log_retry(&self, event: &RetryEvent<'_, E>) {
        // Formatted only if the subscriber accepts the event.
        let error = OptionalError(event.error);
        let policy = event.policy.map(RetryPolicy::as_str).unwrap_or("none");
        let backoff_ms = event.backoff.as_millis() as u64;

        match event.outcome {
            AttemptOutcome::Succeeded => tracing::debug!(
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                "operation succeeded"
            ),
            AttemptOutcome::Retrying => tracing::debug!(
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                backoff_ms,
                policy,
                error = %error,
                "attempt failed, retrying"
            ),
            AttemptOutcome::ManualStop => tracing::info!(
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                policy,
                error = %error,
                "attempt failed, manual retry required"
            ),
            AttemptOutcome::PermanentStop => tracing::warn!(
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                policy,
                error = %error,
                "attempt failed with permanent error"
            ),
            AttemptOutcome::Exhausted => tracing::warn!(
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                policy,
                error = %error,
                "retry attempts exhausted"
            ),
        }
    }
}

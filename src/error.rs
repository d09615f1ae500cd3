//! Error types for retry runs.
//!
//! Operation errors travel through the retrier untouched wherever possible.
//! Only failures the retrier itself decides on (a zero attempt budget, or a
//! budget that ran out) are wrapped in a [`RetryError`].

use std::error::Error;
use std::fmt;

use crate::policy::{AsRetryable, RetryPolicy};

/// Why the retrier itself produced a terminal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RetryErrorCause {
    /// The attempt budget was zero, so the operation never ran.
    ZeroAttempt,
    /// Every attempt failed with a retryable error.
    ExhaustedAttempts,
}

impl RetryErrorCause {
    /// Human-readable label used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            RetryErrorCause::ZeroAttempt => "zero attempt",
            RetryErrorCause::ExhaustedAttempts => "exhausted attempts",
        }
    }
}

impl fmt::Display for RetryErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced by the retrier rather than by the retried operation.
///
/// The policy is fixed at construction and reported as-is by
/// [`retry_policy`](RetryError::retry_policy); it is never recomputed from the
/// wrapped error.
///
/// # Examples
///
/// ```rust
/// use retrier::{RetryError, RetryErrorCause, RetryPolicy};
///
/// let err = RetryError::new(
///     RetryErrorCause::ExhaustedAttempts,
///     "max retries exceeded",
///     RetryPolicy::Manual,
///     Some("connection refused"),
/// );
///
/// assert_eq!(err.cause(), RetryErrorCause::ExhaustedAttempts);
/// assert_eq!(err.retry_policy(), RetryPolicy::Manual);
/// assert_eq!(err.wrapped(), Some(&"connection refused"));
/// assert_eq!(
///     err.to_string(),
///     "retry error (exhausted attempts): max retries exceeded: connection refused"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryError<E> {
    cause: RetryErrorCause,
    message: String,
    policy: RetryPolicy,
    wrapped: Option<E>,
}

impl<E> RetryError<E> {
    /// Create a new RetryError.
    pub fn new(
        cause: RetryErrorCause,
        message: impl Into<String>,
        policy: RetryPolicy,
        wrapped: Option<E>,
    ) -> Self {
        Self {
            cause,
            message: message.into(),
            policy,
            wrapped,
        }
    }

    /// Error for a run configured with no attempts at all.
    pub fn zero_attempt() -> Self {
        Self::new(
            RetryErrorCause::ZeroAttempt,
            "max attempts must be at least 1",
            RetryPolicy::Never,
            None,
        )
    }

    /// Error for a run whose attempt budget ran out.
    ///
    /// Carries [`RetryPolicy::Manual`]: the failure was transient, so retrying
    /// later is reasonable, but the caller has to decide.
    pub fn exhausted(max_attempts: u32, last_error: E) -> Self {
        Self::new(
            RetryErrorCause::ExhaustedAttempts,
            format!("gave up after {max_attempts} attempts"),
            RetryPolicy::Manual,
            Some(last_error),
        )
    }

    /// Why the retrier stopped.
    pub fn cause(&self) -> RetryErrorCause {
        self.cause
    }

    /// The message supplied at construction.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The policy supplied at construction.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// The wrapped operation error, if any.
    pub fn wrapped(&self) -> Option<&E> {
        self.wrapped.as_ref()
    }

    /// Extract the wrapped operation error, discarding the rest.
    pub fn into_wrapped(self) -> Option<E> {
        self.wrapped
    }

    /// Returns true if `target` is also a `RetryError`, whatever its fields.
    ///
    /// Matching is by type identity, so `target` must wrap the same error type.
    pub fn is_kind(&self, target: Option<&(dyn Error + 'static)>) -> bool
    where
        E: Error + 'static,
    {
        target.is_some_and(|t| t.is::<RetryError<E>>())
    }
}

impl<E> AsRetryable for RetryError<E> {
    fn as_retryable(&self) -> Option<RetryPolicy> {
        Some(self.policy)
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retry error ({})", self.cause)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(wrapped) = &self.wrapped {
            write!(f, ": {}", wrapped)?;
        }
        Ok(())
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.wrapped.as_ref().map(|e| e as &(dyn Error + 'static))
    }
}

/// The error carried by every failed [`RetryResult`](crate::RetryResult).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryFailure<E> {
    /// The operation failed with an error that must not be retried
    /// automatically. The error is returned as-is.
    Operation(E),
    /// The retrier gave up: zero attempt budget, or budget exhausted.
    Retry(RetryError<E>),
    /// Cancellation fired while waiting to retry.
    Cancelled {
        /// The error that scheduled the interrupted retry.
        last_error: E,
    },
}

impl<E> RetryFailure<E> {
    /// Returns true if the operation's own error stopped the run.
    pub fn is_operation(&self) -> bool {
        matches!(self, RetryFailure::Operation(_))
    }

    /// Returns true if the retrier produced the error.
    pub fn is_retry_error(&self) -> bool {
        matches!(self, RetryFailure::Retry(_))
    }

    /// Returns true if the run was cancelled during a backoff sleep.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryFailure::Cancelled { .. })
    }

    /// Returns true if the attempt budget ran out.
    pub fn is_exhausted(&self) -> bool {
        self.retry_error()
            .is_some_and(|e| e.cause() == RetryErrorCause::ExhaustedAttempts)
    }

    /// Returns true if the run was configured with zero attempts.
    pub fn is_zero_attempt(&self) -> bool {
        self.retry_error()
            .is_some_and(|e| e.cause() == RetryErrorCause::ZeroAttempt)
    }

    /// The retrier's error, if it produced one.
    pub fn retry_error(&self) -> Option<&RetryError<E>> {
        match self {
            RetryFailure::Retry(e) => Some(e),
            _ => None,
        }
    }

    /// The last operation error, wherever it sits.
    ///
    /// `None` only for a zero attempt run, where the operation never ran.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            RetryFailure::Operation(e) => Some(e),
            RetryFailure::Retry(e) => e.wrapped(),
            RetryFailure::Cancelled { last_error } => Some(last_error),
        }
    }

    /// Extract the last operation error, wherever it sits.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            RetryFailure::Operation(e) => Some(e),
            RetryFailure::Retry(e) => e.into_wrapped(),
            RetryFailure::Cancelled { last_error } => Some(last_error),
        }
    }
}

impl<E: AsRetryable> AsRetryable for RetryFailure<E> {
    fn as_retryable(&self) -> Option<RetryPolicy> {
        match self {
            RetryFailure::Operation(e) => e.as_retryable(),
            RetryFailure::Retry(e) => Some(e.retry_policy()),
            RetryFailure::Cancelled { .. } => Some(RetryPolicy::Never),
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryFailure::Operation(e) => write!(f, "{}", e),
            RetryFailure::Retry(e) => write!(f, "{}", e),
            RetryFailure::Cancelled { last_error } => {
                write!(f, "retry cancelled during backoff: {}", last_error)
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryFailure<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryFailure::Operation(e) => e.source(),
            RetryFailure::Retry(e) => e.source(),
            RetryFailure::Cancelled { last_error } => Some(last_error),
        }
    }
}

/// Find a [`RetryError`] anywhere in an error's `source()` chain.
///
/// Also looks inside a [`RetryFailure`] that was boxed or wrapped by another
/// error type.
pub fn find_retry_error<'a, E: Error + 'static>(
    err: &'a (dyn Error + 'static),
) -> Option<&'a RetryError<E>> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<RetryError<E>>() {
            return Some(found);
        }
        if let Some(found) = e
            .downcast_ref::<RetryFailure<E>>()
            .and_then(RetryFailure::retry_error)
        {
            return Some(found);
        }
        current = e.source();
    }
    None
}

//! The outcome of a retry run.

use std::fmt;

use crate::error::RetryFailure;

/// The terminal outcome of a retry run, together with the number of attempts
/// it took.
///
/// Exactly one of value or error is present. `attempts` counts invocations of
/// the operation; it is zero only when the run was configured with no attempts.
///
/// # Examples
///
/// ```rust
/// use retrier::{RetryFailure, RetryResult};
///
/// let ok: RetryResult<&str, String> = RetryResult::success("done", 2);
/// assert_eq!(ok.decompose(), (Some("done"), 2, None));
///
/// let failed: RetryResult<&str, String> =
///     RetryResult::failure(RetryFailure::Operation("bad input".to_string()), 1);
/// assert_eq!(failed.unwrap_or("fallback"), "fallback");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryResult<T, E> {
    /// The operation eventually succeeded.
    Success {
        /// The operation's value.
        value: T,
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// The run ended without a value.
    Failure {
        /// Why the run ended.
        error: RetryFailure<E>,
        /// Attempts made before giving up.
        attempts: u32,
    },
}

impl<T, E> RetryResult<T, E> {
    /// Create a successful result.
    pub fn success(value: T, attempts: u32) -> Self {
        RetryResult::Success { value, attempts }
    }

    /// Create a failed result.
    pub fn failure(error: RetryFailure<E>, attempts: u32) -> Self {
        RetryResult::Failure { error, attempts }
    }

    /// Returns true if the run produced a value.
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success { .. })
    }

    /// Returns true if the run ended with an error.
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The value, if the run succeeded.
    pub fn value(&self) -> Option<&T> {
        match self {
            RetryResult::Success { value, .. } => Some(value),
            RetryResult::Failure { .. } => None,
        }
    }

    /// The error, if the run failed.
    pub fn err(&self) -> Option<&RetryFailure<E>> {
        match self {
            RetryResult::Success { .. } => None,
            RetryResult::Failure { error, .. } => Some(error),
        }
    }

    /// Number of times the operation was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryResult::Success { attempts, .. } | RetryResult::Failure { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Split into `(value, attempts, error)`.
    ///
    /// Exactly one of `value` and `error` is `Some`.
    pub fn decompose(self) -> (Option<T>, u32, Option<RetryFailure<E>>) {
        match self {
            RetryResult::Success { value, attempts } => (Some(value), attempts, None),
            RetryResult::Failure { error, attempts } => (None, attempts, Some(error)),
        }
    }

    /// Return the value, or `default` if the run failed.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            RetryResult::Success { value, .. } => value,
            RetryResult::Failure { .. } => default,
        }
    }

    /// Return the value, or `T::default()` if the run failed.
    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        match self {
            RetryResult::Success { value, .. } => value,
            RetryResult::Failure { .. } => T::default(),
        }
    }

    /// Return the value, panicking if the run failed.
    ///
    /// # Panics
    ///
    /// Panics with the error's description when called on a failure. Only use
    /// this once success is already established; prefer
    /// [`decompose`](RetryResult::decompose) or
    /// [`unwrap_or`](RetryResult::unwrap_or) everywhere else.
    #[track_caller]
    pub fn unwrap(self) -> T
    where
        E: fmt::Display,
    {
        match self {
            RetryResult::Success { value, .. } => value,
            RetryResult::Failure { error, attempts } => panic!(
                "called `RetryResult::unwrap()` on a failure after {} attempts: {}",
                attempts, error
            ),
        }
    }

    /// Drop the attempt count and convert into a standard `Result`.
    pub fn into_result(self) -> Result<T, RetryFailure<E>> {
        match self {
            RetryResult::Success { value, .. } => Ok(value),
            RetryResult::Failure { error, .. } => Err(error),
        }
    }

    /// Transform the success value, keeping the attempt count.
    pub fn map<U, F>(self, f: F) -> RetryResult<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            RetryResult::Success { value, attempts } => RetryResult::Success {
                value: f(value),
                attempts,
            },
            RetryResult::Failure { error, attempts } => RetryResult::Failure { error, attempts },
        }
    }
}

impl<T, E> From<RetryResult<T, E>> for Result<T, RetryFailure<E>> {
    fn from(result: RetryResult<T, E>) -> Self {
        result.into_result()
    }
}

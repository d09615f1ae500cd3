//! Retry policy classification.
//!
//! Every failed attempt is classified before the retry loop decides what to do
//! next. Errors opt into classification through the [`AsRetryable`]
//! capability; errors that do not declare a policy are treated as permanent.

use std::fmt;

/// How the retry loop should react to an error.
///
/// # Examples
///
/// ```rust
/// use retrier::{classify, AsRetryable, RetryPolicy};
///
/// #[derive(Debug)]
/// struct Throttled;
///
/// impl AsRetryable for Throttled {
///     fn as_retryable(&self) -> Option<RetryPolicy> {
///         Some(RetryPolicy::Auto)
///     }
/// }
///
/// assert_eq!(classify(&Throttled), RetryPolicy::Auto);
/// assert_eq!(classify(&String::from("unknown")), RetryPolicy::Never);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RetryPolicy {
    /// The loop may retry automatically.
    Auto,
    /// Retryable in principle, but the caller decides. The loop stops.
    Manual,
    /// Permanent failure. The loop stops.
    Never,
}

impl RetryPolicy {
    /// Returns true only for [`RetryPolicy::Auto`].
    pub fn is_auto(self) -> bool {
        matches!(self, RetryPolicy::Auto)
    }

    /// Short lowercase label, used in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            RetryPolicy::Auto => "auto",
            RetryPolicy::Manual => "manual",
            RetryPolicy::Never => "never",
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional capability of an error to declare its own [`RetryPolicy`].
///
/// The default implementation declares nothing, so unit impls such as
/// `impl AsRetryable for MyError {}` mark a type as "known but unclassified",
/// which the classifier treats as [`RetryPolicy::Never`].
pub trait AsRetryable {
    /// The policy this error declares, or `None` if it carries no classification.
    fn as_retryable(&self) -> Option<RetryPolicy> {
        None
    }
}

impl<T: AsRetryable + ?Sized> AsRetryable for &T {
    fn as_retryable(&self) -> Option<RetryPolicy> {
        (**self).as_retryable()
    }
}

impl AsRetryable for String {}

impl AsRetryable for str {}

impl AsRetryable for std::io::Error {}

impl AsRetryable for Box<dyn std::error::Error + Send + Sync> {}

impl AsRetryable for Box<dyn std::error::Error> {}

/// Looks up the policy an error declares.
///
/// Returns `None` when the error does not expose the capability.
pub fn as_retryable<E: AsRetryable + ?Sized>(err: &E) -> Option<RetryPolicy> {
    err.as_retryable()
}

/// Decides whether another attempt is permitted after `err`.
///
/// A declared policy is used verbatim. Errors without one are
/// [`RetryPolicy::Never`].
pub fn classify<E: AsRetryable + ?Sized>(err: &E) -> RetryPolicy {
    as_retryable(err).unwrap_or(RetryPolicy::Never)
}

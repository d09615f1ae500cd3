//! # Retrier
//!
//! Retry fallible async operations with exponential backoff, jitter and
//! cooperative cancellation.
//!
//! Errors decide for themselves whether they are worth retrying by
//! implementing [`AsRetryable`]:
//! - [`RetryPolicy::Auto`] errors are retried until the attempt budget runs out
//! - [`RetryPolicy::Manual`] errors stop the loop and hand the decision back
//! - [`RetryPolicy::Never`] errors, and errors that say nothing, stop immediately
//!
//! ## Quick Example
//!
//! ```rust
//! use retrier::prelude::*;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! enum FetchError {
//!     Timeout,
//!     NotFound,
//! }
//!
//! impl AsRetryable for FetchError {
//!     fn as_retryable(&self) -> Option<RetryPolicy> {
//!         match self {
//!             FetchError::Timeout => Some(RetryPolicy::Auto),
//!             FetchError::NotFound => Some(RetryPolicy::Never),
//!         }
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let config = RetryConfig::default()
//!     .with_max_attempts(4)
//!     .with_initial_duration(Duration::from_millis(1))
//!     .with_jitter(Duration::from_millis(1));
//!
//! let result = retry(&CancellationToken::new(), &NoOpLogger, &config, || async {
//!     Err::<(), _>(FetchError::NotFound)
//! })
//! .await;
//!
//! // Permanent errors are returned as-is after a single attempt.
//! assert_eq!(result.attempts(), 1);
//! assert!(result.err().is_some_and(RetryFailure::is_operation));
//! # });
//! ```
//!
//! ## Observing retries
//!
//! Every attempt outcome is reported to a [`DebugLogger`]. With the default
//! `tracing` feature, [`TracingLogger`] forwards events to the `tracing`
//! ecosystem, and every run is wrapped in a `retry` span.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod backoff;
pub mod config;
pub mod error;
pub mod logger;
pub mod policy;
pub mod result;
pub mod retry;
pub mod testing;

// Re-exports
pub use backoff::{apply_jitter, backoff_delay, base_delay};
pub use config::RetryConfig;
pub use error::{find_retry_error, RetryError, RetryErrorCause, RetryFailure};
#[cfg(feature = "tracing")]
pub use logger::TracingLogger;
pub use logger::{fn_logger, AttemptOutcome, DebugLogger, FnLogger, NoOpLogger, RetryEvent};
pub use policy::{as_retryable, classify, AsRetryable, RetryPolicy};
pub use result::RetryResult;
pub use retry::{retry, retry_with_rng, Retrier};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::RetryConfig;
    pub use crate::error::{RetryError, RetryErrorCause, RetryFailure};
    #[cfg(feature = "tracing")]
    pub use crate::logger::TracingLogger;
    pub use crate::logger::{AttemptOutcome, DebugLogger, NoOpLogger, RetryEvent};
    pub use crate::policy::{as_retryable, classify, AsRetryable, RetryPolicy};
    pub use crate::result::RetryResult;
    pub use crate::retry::{retry, Retrier};
}

//! The retry loop.
//!
//! A run moves through a small state machine:
//!
//! ```text
//! Idle -> Attempting -> Succeeded | ManualStop | PermanentStop | Exhausted
//!             ^              |
//!             +-- Retrying <-+
//! ```
//!
//! The only suspension point besides the operation itself is the backoff
//! sleep, which races against a [`CancellationToken`].

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backoff::backoff_delay;
use crate::config::RetryConfig;
use crate::error::{RetryError, RetryFailure};
use crate::logger::{AttemptOutcome, DebugLogger, NoOpLogger, RetryEvent};
use crate::policy::{classify, AsRetryable, RetryPolicy};
use crate::result::RetryResult;

/// Run `operation` until it succeeds, fails permanently, runs out of attempts,
/// or `cancel` fires during a backoff sleep.
///
/// Each failure is classified with [`classify`]: only errors declaring
/// [`RetryPolicy::Auto`] are retried. Errors that stop the run are returned
/// unwrapped in [`RetryFailure::Operation`]; an exhausted budget wraps the last
/// error in a [`RetryError`].
///
/// Jitter is drawn from a generator seeded freshly for this call, so
/// concurrent runs never share randomness. Use [`retry_with_rng`] to supply
/// your own.
///
/// # Examples
///
/// ```rust
/// use retrier::{retry, AsRetryable, NoOpLogger, RetryConfig, RetryPolicy};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug)]
/// struct Unavailable;
///
/// impl AsRetryable for Unavailable {
///     fn as_retryable(&self) -> Option<RetryPolicy> {
///         Some(RetryPolicy::Auto)
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let calls = AtomicU32::new(0);
/// let config = RetryConfig::default()
///     .with_max_attempts(5)
///     .with_initial_duration(Duration::from_millis(1));
///
/// let result = retry(&CancellationToken::new(), &NoOpLogger, &config, || {
///     let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
///     async move {
///         if n < 3 {
///             Err(Unavailable)
///         } else {
///             Ok(n)
///         }
///     }
/// })
/// .await;
///
/// assert_eq!(result.attempts(), 3);
/// assert_eq!(result.value(), Some(&3));
/// # });
/// ```
pub async fn retry<T, E, L, F, Fut>(
    cancel: &CancellationToken,
    logger: &L,
    config: &RetryConfig,
    operation: F,
) -> RetryResult<T, E>
where
    E: AsRetryable,
    L: DebugLogger<E> + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut rng = StdRng::from_rng(&mut rand::rng());
    retry_with_rng(cancel, logger, config, &mut rng, operation).await
}

/// Like [`retry`], drawing jitter from `rng`.
///
/// Pass a seeded generator to make jittered delays reproducible.
pub async fn retry_with_rng<T, E, L, R, F, Fut>(
    cancel: &CancellationToken,
    logger: &L,
    config: &RetryConfig,
    rng: &mut R,
    operation: F,
) -> RetryResult<T, E>
where
    E: AsRetryable,
    L: DebugLogger<E> + ?Sized,
    R: Rng,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    #[cfg(feature = "tracing")]
    {
        use tracing::Instrument as _;
        let span = tracing::debug_span!("retry", max_attempts = config.max_attempts());
        run_loop(cancel, logger, config, rng, operation)
            .instrument(span)
            .await
    }

    #[cfg(not(feature = "tracing"))]
    {
        run_loop(cancel, logger, config, rng, operation).await
    }
}

async fn run_loop<T, E, L, R, F, Fut>(
    cancel: &CancellationToken,
    logger: &L,
    config: &RetryConfig,
    rng: &mut R,
    mut operation: F,
) -> RetryResult<T, E>
where
    E: AsRetryable,
    L: DebugLogger<E> + ?Sized,
    R: Rng,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_attempts();
    if max_attempts == 0 {
        #[cfg(feature = "tracing")]
        tracing::warn!("retry started with a zero attempt budget");
        return RetryResult::failure(RetryFailure::Retry(RetryError::zero_attempt()), 0);
    }

    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        let error = match operation().await {
            Ok(value) => {
                notify(
                    logger,
                    &RetryEvent {
                        attempt: attempts,
                        max_attempts,
                        backoff: Duration::ZERO,
                        error: None,
                        outcome: AttemptOutcome::Succeeded,
                        policy: None,
                        elapsed: start.elapsed(),
                    },
                );
                return RetryResult::success(value, attempts);
            }
            Err(error) => error,
        };

        let policy = classify(&error);
        let stop = match policy {
            RetryPolicy::Never => Some(AttemptOutcome::PermanentStop),
            RetryPolicy::Manual => Some(AttemptOutcome::ManualStop),
            RetryPolicy::Auto if attempts >= max_attempts => Some(AttemptOutcome::Exhausted),
            RetryPolicy::Auto => None,
        };

        if let Some(outcome) = stop {
            notify(
                logger,
                &RetryEvent {
                    attempt: attempts,
                    max_attempts,
                    backoff: Duration::ZERO,
                    error: Some(&error),
                    outcome,
                    policy: Some(policy),
                    elapsed: start.elapsed(),
                },
            );
            let failure = match outcome {
                AttemptOutcome::Exhausted => {
                    RetryFailure::Retry(RetryError::exhausted(max_attempts, error))
                }
                _ => RetryFailure::Operation(error),
            };
            return RetryResult::failure(failure, attempts);
        }

        let delay = backoff_delay(attempts, config, rng);
        notify(
            logger,
            &RetryEvent {
                attempt: attempts,
                max_attempts,
                backoff: delay,
                error: Some(&error),
                outcome: AttemptOutcome::Retrying,
                policy: Some(policy),
                elapsed: start.elapsed(),
            },
        );

        #[cfg(feature = "tracing")]
        tracing::trace!(attempt = attempts, delay_ms = delay.as_millis() as u64, "sleeping");

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt = attempts, "retry cancelled during backoff");
                return RetryResult::failure(RetryFailure::Cancelled { last_error: error }, attempts);
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}

/// Report an event, isolating the loop from a panicking observer.
fn notify<E, L>(logger: &L, event: &RetryEvent<'_, E>)
where
    E: ?Sized,
    L: DebugLogger<E> + ?Sized,
{
    let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
        if logger.enabled() {
            logger.log_retry(event);
        }
    }));

    if delivered.is_err() {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            attempt = event.attempt,
            outcome = %event.outcome,
            "retry logger panicked, event dropped"
        );
    }
}

/// A reusable retry setup: configuration, observer and cancellation token.
///
/// Every [`run`](Retrier::run) is an independent retry run; nothing carries
/// over between calls.
///
/// # Examples
///
/// ```rust
/// use retrier::{Retrier, RetryConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # tokio_test::block_on(async {
/// let retrier = Retrier::new(RetryConfig::default().with_max_attempts(2))
///     .with_cancellation(CancellationToken::new());
///
/// let result = retrier.run(|| async { Ok::<_, String>("ready") }).await;
/// assert_eq!(result.unwrap(), "ready");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Retrier<L = NoOpLogger> {
    config: RetryConfig,
    logger: L,
    cancel: CancellationToken,
}

impl Retrier<NoOpLogger> {
    /// Create a retrier with no observer and a token that is never cancelled.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            logger: NoOpLogger,
            cancel: CancellationToken::new(),
        }
    }
}

impl Default for Retrier<NoOpLogger> {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl<L> Retrier<L> {
    /// Replace the observer.
    pub fn with_logger<L2>(self, logger: L2) -> Retrier<L2> {
        Retrier {
            config: self.config,
            logger,
            cancel: self.cancel,
        }
    }

    /// Replace the cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Get the observer.
    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Get the cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `operation` with this retrier's settings. See [`retry`].
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> RetryResult<T, E>
    where
        E: AsRetryable,
        L: DebugLogger<E>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        retry(&self.cancel, &self.logger, &self.config, operation).await
    }

    /// Run `operation`, drawing jitter from `rng`. See [`retry_with_rng`].
    pub async fn run_with_rng<T, E, R, F, Fut>(&self, rng: &mut R, operation: F) -> RetryResult<T, E>
    where
        E: AsRetryable,
        L: DebugLogger<E>,
        R: Rng,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        retry_with_rng(&self.cancel, &self.logger, &self.config, rng, operation).await
    }
}

#[cfg(test)]
mod tests;

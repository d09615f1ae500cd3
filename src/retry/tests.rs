//! Tests for the retry loop.

use super::*;
use crate::error::RetryErrorCause;
use crate::logger::fn_logger;
use crate::testing::RecordingLogger;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum TestError {
    Transient(&'static str),
    Permanent,
    NeedsReview,
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Transient(msg) => write!(f, "transient: {}", msg),
            TestError::Permanent => write!(f, "permanent"),
            TestError::NeedsReview => write!(f, "needs review"),
        }
    }
}

impl std::error::Error for TestError {}

impl AsRetryable for TestError {
    fn as_retryable(&self) -> Option<RetryPolicy> {
        Some(match self {
            TestError::Transient(_) => RetryPolicy::Auto,
            TestError::Permanent => RetryPolicy::Never,
            TestError::NeedsReview => RetryPolicy::Manual,
        })
    }
}

fn config(max_attempts: u32, initial_ms: u64, multiplier: f64) -> RetryConfig {
    RetryConfig::default()
        .with_max_attempts(max_attempts)
        .with_initial_duration(Duration::from_millis(initial_ms))
        .with_multiplier(multiplier)
        .with_max_duration(Duration::from_secs(60))
}

#[tokio::test(start_paused = true)]
async fn test_zero_attempts_never_invokes_operation() {
    let calls = AtomicU32::new(0);
    let logger = RecordingLogger::new();

    let result = retry(&CancellationToken::new(), &logger, &config(0, 10, 2.0), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, TestError>(()) }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.attempts(), 0);
    let err = result.err().expect("failure");
    assert!(err.is_zero_attempt());
    assert_eq!(
        err.retry_error().map(RetryError::cause),
        Some(RetryErrorCause::ZeroAttempt)
    );
    assert!(logger.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_always_failing_exhausts_budget() {
    let calls = AtomicU32::new(0);
    let logger = RecordingLogger::new();

    let result = retry(&CancellationToken::new(), &logger, &config(4, 10, 2.0), || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            Err::<(), _>(TestError::Transient(if n == 4 { "last" } else { "early" }))
        }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(result.attempts(), 4);
    assert_eq!(
        logger.backoffs(),
        vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40),
        ]
    );

    let events = logger.events();
    assert_eq!(events.len(), 4);
    let last = events.last().expect("terminal event");
    assert_eq!(last.outcome, AttemptOutcome::Exhausted);
    assert_eq!(last.backoff, Duration::ZERO);
    assert_eq!(last.attempt, 4);

    let err = result.err().expect("failure");
    assert!(err.is_exhausted());
    let retry_err = err.retry_error().expect("retry error");
    assert_eq!(retry_err.retry_policy(), RetryPolicy::Manual);
    assert_eq!(retry_err.wrapped(), Some(&TestError::Transient("last")));
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_budget_exhausts_without_retrying() {
    let calls = AtomicU32::new(0);
    let logger = RecordingLogger::new();
    let start = Instant::now();

    let result = retry(&CancellationToken::new(), &logger, &config(1, 10, 2.0), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(TestError::Transient("once")) }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.attempts(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(logger.backoffs().is_empty());

    let events = logger.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, AttemptOutcome::Exhausted);
    assert_eq!(events[0].backoff, Duration::ZERO);
    assert_eq!(events[0].attempt, 1);
    assert_eq!(events[0].max_attempts, 1);

    let err = result.err().expect("failure");
    assert!(err.is_exhausted());
    assert_eq!(err.operation_error(), Some(&TestError::Transient("once")));
}

#[tokio::test(start_paused = true)]
async fn test_single_retry_uses_initial_delay() {
    let calls = AtomicU32::new(0);
    let logger = RecordingLogger::new();

    let result = retry(&CancellationToken::new(), &logger, &config(3, 10, 2.0), || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n == 1 {
                Err(TestError::Transient("blip"))
            } else {
                Ok("success")
            }
        }
    })
    .await;

    assert_eq!(result.decompose(), (Some("success"), 2, None));

    let events = logger.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].outcome, AttemptOutcome::Retrying);
    assert_eq!(events[0].backoff, Duration::from_millis(10));
    assert_eq!(events[0].error.as_deref(), Some("transient: blip"));
    assert_eq!(events[1].outcome, AttemptOutcome::Succeeded);
    assert_eq!(events[1].backoff, Duration::ZERO);
    assert_eq!(events[1].error, None);
}

#[tokio::test(start_paused = true)]
async fn test_never_policy_returns_error_unwrapped() {
    let calls = AtomicU32::new(0);
    let logger = RecordingLogger::new();

    let result = retry(&CancellationToken::new(), &logger, &config(5, 10, 2.0), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(TestError::Permanent) }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        result,
        RetryResult::failure(RetryFailure::Operation(TestError::Permanent), 1)
    );
    let last = logger.last().expect("event");
    assert_eq!(last.outcome, AttemptOutcome::PermanentStop);
    assert_eq!(last.backoff, Duration::ZERO);
    assert_eq!(last.policy, Some(RetryPolicy::Never));
}

#[tokio::test(start_paused = true)]
async fn test_manual_policy_stops_without_wrapping() {
    let calls = AtomicU32::new(0);
    let logger = RecordingLogger::new();

    let result = retry(&CancellationToken::new(), &logger, &config(5, 10, 2.0), || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n == 1 {
                Err::<(), _>(TestError::Transient("blip"))
            } else {
                Err(TestError::NeedsReview)
            }
        }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        result,
        RetryResult::failure(RetryFailure::Operation(TestError::NeedsReview), 2)
    );
    let outcomes: Vec<_> = logger.events().iter().map(|e| e.outcome).collect();
    assert_eq!(
        outcomes,
        vec![AttemptOutcome::Retrying, AttemptOutcome::ManualStop]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unclassified_error_is_not_retried() {
    let calls = AtomicU32::new(0);

    let result = retry(&CancellationToken::new(), &NoOpLogger, &config(5, 10, 2.0), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(std::io::Error::other("disk on fire")) }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let err = result.err().expect("failure");
    assert!(err.is_operation());
    assert_eq!(
        err.operation_error().map(ToString::to_string),
        Some("disk on fire".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_backoff() {
    let cancel = CancellationToken::new();
    let calls = AtomicU32::new(0);

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let result = retry(&cancel, &NoOpLogger, &config(5, 10_000, 2.0), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(TestError::Transient("down")) }
    })
    .await;

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        result,
        RetryResult::failure(
            RetryFailure::Cancelled {
                last_error: TestError::Transient("down")
            },
            1
        )
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_token_still_runs_first_attempt() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let calls = AtomicU32::new(0);

    let result = retry(&cancel, &NoOpLogger, &config(5, 10_000, 2.0), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(TestError::Transient("down")) }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(result.err().is_some_and(RetryFailure::is_cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped() {
    let calls = AtomicU32::new(0);
    let logger = RecordingLogger::new();
    let config = RetryConfig::default()
        .with_max_attempts(7)
        .with_initial_duration(Duration::from_millis(100))
        .with_multiplier(10.0)
        .with_max_duration(Duration::from_millis(50));

    let result = retry(&CancellationToken::new(), &logger, &config, || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 6 {
                Err(TestError::Transient("slow"))
            } else {
                Ok(n)
            }
        }
    })
    .await;

    assert_eq!(result.value(), Some(&6));
    assert_eq!(logger.backoffs(), vec![Duration::from_millis(50); 5]);
}

#[tokio::test(start_paused = true)]
async fn test_sleeps_follow_schedule() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result = retry(&CancellationToken::new(), &NoOpLogger, &config(5, 10, 2.0), || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 4 {
                Err(TestError::Transient("retry"))
            } else {
                Ok(())
            }
        }
    })
    .await;

    assert!(result.is_success());
    // 10ms + 20ms + 40ms
    assert!(start.elapsed() >= Duration::from_millis(70));
}

#[tokio::test(start_paused = true)]
async fn test_panicking_logger_does_not_break_loop() {
    let calls = AtomicU32::new(0);
    let logger = fn_logger(|_: &RetryEvent<'_, TestError>| panic!("observer exploded"));

    let result = retry(&CancellationToken::new(), &logger, &config(3, 10, 2.0), || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 3 {
                Err(TestError::Transient("blip"))
            } else {
                Ok("done")
            }
        }
    })
    .await;

    assert_eq!(result, RetryResult::success("done", 3));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_logger_receives_nothing() {
    let logger = RecordingLogger::disabled();

    let result = retry(&CancellationToken::new(), &logger, &config(2, 10, 2.0), || async {
        Err::<(), _>(TestError::Transient("down"))
    })
    .await;

    assert!(result.err().is_some_and(RetryFailure::is_exhausted));
    assert!(logger.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_seeded_rng_reproduces_jitter() {
    let config = config(4, 100, 2.0).with_jitter(Duration::from_millis(30));
    let logger = RecordingLogger::new();

    let result = retry_with_rng(
        &CancellationToken::new(),
        &logger,
        &config,
        &mut StdRng::seed_from_u64(99),
        || async { Err::<(), _>(TestError::Transient("down")) },
    )
    .await;
    assert_eq!(result.attempts(), 4);

    let mut rng = StdRng::seed_from_u64(99);
    let expected: Vec<_> = (1..=3)
        .map(|attempt| backoff_delay(attempt, &config, &mut rng))
        .collect();
    assert_eq!(logger.backoffs(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_are_independent() {
    let fast_calls = Arc::new(AtomicU32::new(0));
    let slow_calls = Arc::new(AtomicU32::new(0));
    let fast_logger = Arc::new(RecordingLogger::new());
    let slow_logger = Arc::new(RecordingLogger::new());

    let fast = {
        let calls = fast_calls.clone();
        let logger = fast_logger.clone();
        tokio::spawn(async move {
            let config = config(3, 5, 2.0).with_jitter(Duration::from_millis(2));
            retry(&CancellationToken::new(), &logger, &config, || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 2 {
                        Err(TestError::Transient("fast"))
                    } else {
                        Ok("fast done")
                    }
                }
            })
            .await
        })
    };

    let slow = {
        let calls = slow_calls.clone();
        let logger = slow_logger.clone();
        tokio::spawn(async move {
            let config = config(6, 20, 3.0);
            retry(&CancellationToken::new(), &logger, &config, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<&str, _>(TestError::Transient("slow")) }
            })
            .await
        })
    };

    let results = futures::future::join_all([fast, slow]).await;
    let results: Vec<_> = results
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(results[0], RetryResult::success("fast done", 2));
    assert!(results[1].err().is_some_and(RetryFailure::is_exhausted));
    assert_eq!(results[1].attempts(), 6);

    assert_eq!(fast_calls.load(Ordering::SeqCst), 2);
    assert_eq!(slow_calls.load(Ordering::SeqCst), 6);
    assert_eq!(fast_logger.len(), 2);
    assert_eq!(
        slow_logger.backoffs(),
        vec![
            Duration::from_millis(20),
            Duration::from_millis(60),
            Duration::from_millis(180),
            Duration::from_millis(540),
            Duration::from_millis(1_620),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_retrier_runs_are_independent() {
    let logger = Arc::new(RecordingLogger::new());
    let retrier = Retrier::new(config(3, 10, 2.0)).with_logger(logger.clone());
    let calls = AtomicU32::new(0);

    let first = retrier
        .run(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    Err(TestError::Transient("blip"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
    let second = retrier
        .run(|| async { Ok::<_, TestError>(0) })
        .await;

    assert_eq!(first, RetryResult::success(2, 2));
    assert_eq!(second, RetryResult::success(0, 1));
    assert_eq!(logger.len(), 3);
    assert_eq!(retrier.config().max_attempts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retrier_honors_its_token() {
    let cancel = CancellationToken::new();
    let retrier = Retrier::new(config(3, 10_000, 2.0)).with_cancellation(cancel.clone());
    cancel.cancel();

    let result = retrier
        .run(|| async { Err::<(), _>(TestError::Transient("down")) })
        .await;

    assert_eq!(result.attempts(), 1);
    assert!(result.err().is_some_and(RetryFailure::is_cancelled));
    assert!(retrier.cancellation().is_cancelled());
}

#[cfg(feature = "tracing")]
mod tracing_output {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_logger_panic_is_reported() {
        let logger = fn_logger(|_: &RetryEvent<'_, TestError>| panic!("observer exploded"));

        let result = retry(&CancellationToken::new(), &logger, &config(1, 10, 2.0), || async {
            Ok::<_, TestError>(1)
        })
        .await;

        assert!(result.is_success());
        assert!(logs_contain("retry logger panicked"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_cancellation_is_logged() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let _ = retry(&cancel, &NoOpLogger, &config(3, 10, 2.0), || async {
            Err::<(), _>(TestError::Transient("down"))
        })
        .await;

        assert!(logs_contain("retry cancelled during backoff"));
    }
}

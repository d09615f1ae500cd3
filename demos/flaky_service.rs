//! Flaky Service Example
//!
//! Demonstrates retrying calls against an in-process service that fails
//! intermittently. Shows:
//! - Transient errors retried with exponential backoff and jitter
//! - Permanent errors returned after a single attempt
//! - A custom observer printing every attempt
//! - Cancelling a run that is waiting to retry
//! - Forwarding retry events to `tracing`

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use retrier::prelude::*;
use tokio_util::sync::CancellationToken;

// ==================== Service ====================

#[derive(Debug, Clone, PartialEq)]
enum ServiceError {
    Overloaded,
    BadRequest(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Overloaded => write!(f, "service overloaded"),
            ServiceError::BadRequest(reason) => write!(f, "bad request: {}", reason),
        }
    }
}

impl std::error::Error for ServiceError {}

impl AsRetryable for ServiceError {
    fn as_retryable(&self) -> Option<RetryPolicy> {
        match self {
            ServiceError::Overloaded => Some(RetryPolicy::Auto),
            ServiceError::BadRequest(_) => Some(RetryPolicy::Never),
        }
    }
}

/// Fails with `Overloaded` until it has been called `recovers_after` times.
struct FlakyService {
    calls: AtomicU32,
    recovers_after: u32,
}

impl FlakyService {
    fn new(recovers_after: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            recovers_after,
        }
    }

    async fn fetch(&self, key: &str) -> Result<String, ServiceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if key.is_empty() {
            return Err(ServiceError::BadRequest("empty key".to_string()));
        }
        if n < self.recovers_after {
            Err(ServiceError::Overloaded)
        } else {
            Ok(format!("value for {}", key))
        }
    }
}

// ==================== Observer ====================

/// Prints every attempt to stdout.
struct SimpleLogger;

impl<E: fmt::Display + ?Sized> DebugLogger<E> for SimpleLogger {
    fn enabled(&self) -> bool {
        true
    }

    fn log_retry(&self, event: &RetryEvent<'_, E>) {
        match event.error {
            Some(err) => println!(
                "  attempt {}/{}: {} ({}), next wait {:?}",
                event.attempt, event.max_attempts, err, event.outcome, event.backoff
            ),
            None => println!(
                "  attempt {}/{}: ok after {:?}",
                event.attempt, event.max_attempts, event.elapsed
            ),
        }
    }
}

fn config() -> RetryConfig {
    RetryConfig::default()
        .with_max_attempts(5)
        .with_initial_duration(Duration::from_millis(50))
        .with_multiplier(2.0)
        .with_max_duration(Duration::from_millis(500))
        .with_jitter(Duration::from_millis(10))
}

// ==================== Examples ====================

/// Example 1: the service recovers before the budget runs out
async fn example_recovery() {
    println!("\n=== Example 1: Recovery ===");

    let service = FlakyService::new(3);
    let result = retry(&CancellationToken::new(), &SimpleLogger, &config(), || {
        service.fetch("user:42")
    })
    .await;

    match result.into_result() {
        Ok(value) => println!("Got: {}", value),
        Err(err) => println!("Failed: {}", err),
    }
}

/// Example 2: the service never recovers
async fn example_exhausted() {
    println!("\n=== Example 2: Exhausted ===");

    let service = FlakyService::new(u32::MAX);
    let result = retry(&CancellationToken::new(), &SimpleLogger, &config(), || {
        service.fetch("user:42")
    })
    .await;

    let attempts = result.attempts();
    if let Some(err) = result.err() {
        println!("Gave up after {} attempts: {}", attempts, err);
        println!("Retry later? {}", classify(err) == RetryPolicy::Manual);
    }
}

/// Example 3: a permanent error is not retried
async fn example_permanent() {
    println!("\n=== Example 3: Permanent Error ===");

    let service = FlakyService::new(1);
    let result = retry(&CancellationToken::new(), &SimpleLogger, &config(), || {
        service.fetch("")
    })
    .await;

    println!(
        "Attempts: {}, error: {:?}",
        result.attempts(),
        result.err().and_then(RetryFailure::operation_error)
    );
}

/// Example 4: shutting down while a retry is pending
async fn example_cancellation() {
    println!("\n=== Example 4: Cancellation ===");

    let cancel = CancellationToken::new();
    let service = FlakyService::new(u32::MAX);
    let retrier = Retrier::new(
        config()
            .with_initial_duration(Duration::from_secs(5))
            .with_max_duration(Duration::from_secs(10)),
    )
    .with_logger(SimpleLogger)
    .with_cancellation(cancel.clone());

    let shutdown = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        println!("  shutdown requested");
        cancel.cancel();
    });

    let result = retrier.run(|| service.fetch("user:42")).await;
    let _ = shutdown.await;

    match result.err() {
        Some(err) if err.is_cancelled() => println!("Stopped early: {}", err),
        other => println!("Unexpected outcome: {:?}", other),
    }
}

/// Example 5: the same run, reported through `tracing`
async fn example_tracing() {
    println!("\n=== Example 5: Tracing ===");

    let service = FlakyService::new(2);
    let result = retry(&CancellationToken::new(), &TracingLogger, &config(), || {
        service.fetch("user:42")
    })
    .await;

    println!("Succeeded: {}", result.is_success());
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    println!("Flaky Service Examples");
    println!("======================");

    example_recovery().await;
    example_exhausted().await;
    example_permanent().await;
    example_cancellation().await;
    example_tracing().await;

    println!("\n=== All examples completed ===");
}

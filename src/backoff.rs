//! Exponential backoff with bounded jitter.
//!
//! Delays are pure functions of the attempt number and a [`RetryConfig`]. The
//! only source of nondeterminism is the random number generator passed in by
//! the caller, so tests can pin jitter with a seeded RNG.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Calculate the un-jittered delay before retry number `attempt`.
///
/// `attempt` counts from 1 for the first retry:
/// `initial_delay * multiplier^(attempt - 1)`, capped at `max_delay`. Attempt
/// 0 is treated as attempt 1.
///
/// # Examples
///
/// ```rust
/// use retrier::{base_delay, RetryConfig};
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_initial_duration(Duration::from_millis(100))
///     .with_multiplier(2.0)
///     .with_max_duration(Duration::from_millis(500));
///
/// assert_eq!(base_delay(1, &config), Duration::from_millis(100));
/// assert_eq!(base_delay(2, &config), Duration::from_millis(200));
/// assert_eq!(base_delay(3, &config), Duration::from_millis(400));
/// assert_eq!(base_delay(4, &config), Duration::from_millis(500)); // capped
/// assert_eq!(base_delay(u32::MAX, &config), Duration::from_millis(500));
/// ```
pub fn base_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let max = config.max_delay();
    if config.initial_delay().is_zero() {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(attempt.max(1) - 1).unwrap_or(i32::MAX);
    let scaled = config.initial_delay().as_nanos() as f64 * config.multiplier().powi(exponent);

    // NaN only comes from a NaN multiplier; treat it like overflow.
    if scaled.is_nan() {
        return max;
    }
    if scaled <= 0.0 {
        return Duration::ZERO;
    }

    let max_nanos = max.as_nanos();
    if scaled >= max_nanos as f64 {
        return max;
    }
    nanos_to_duration((scaled.round() as u128).min(max_nanos))
}

/// Calculate the delay before retry number `attempt`, jitter included.
///
/// With a zero jitter bound no randomness is drawn and the result equals
/// [`base_delay`]. Otherwise a uniform offset in `[-jitter, +jitter]` is added
/// and the sum is clamped to `[0, max_delay]`.
///
/// # Examples
///
/// ```rust
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use retrier::{backoff_delay, RetryConfig};
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_initial_duration(Duration::from_millis(100))
///     .with_max_duration(Duration::from_secs(1))
///     .with_jitter(Duration::from_millis(20));
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let delay = backoff_delay(1, &config, &mut rng);
/// assert!(delay >= Duration::from_millis(80));
/// assert!(delay <= Duration::from_millis(120));
/// ```
pub fn backoff_delay<R: Rng>(attempt: u32, config: &RetryConfig, rng: &mut R) -> Duration {
    apply_jitter(
        base_delay(attempt, config),
        config.jitter(),
        config.max_delay(),
        rng,
    )
}

/// Perturb `delay` by up to `jitter` in either direction, staying within `[0, max]`.
pub fn apply_jitter<R: Rng>(
    delay: Duration,
    jitter: Duration,
    max: Duration,
    rng: &mut R,
) -> Duration {
    if jitter.is_zero() {
        return delay.min(max);
    }

    let bound = i64::try_from(jitter.as_nanos()).unwrap_or(i64::MAX);
    let offset = rng.random_range(-bound..=bound);

    let jittered = delay.as_nanos() as i128 + i128::from(offset);
    let clamped = jittered.clamp(0, max.as_nanos() as i128);
    nanos_to_duration(clamped as u128)
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}

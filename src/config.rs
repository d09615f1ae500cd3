//! Retry configuration.

use std::time::Duration;

/// Default attempt budget, including the first attempt.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);
/// Default growth factor applied per retry.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
/// Default cap on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);
/// Default jitter bound. Zero keeps delays deterministic.
pub const DEFAULT_JITTER: Duration = Duration::ZERO;

/// Configuration for a retry run.
///
/// Configs are plain data: build one from [`RetryConfig::default`] and override
/// individual settings. Every setting is independent; anything left unset keeps
/// its documented default.
///
/// # Examples
///
/// ```rust
/// use retrier::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_attempts(5)
///     .with_initial_duration(Duration::from_millis(50))
///     .with_multiplier(3.0)
///     .with_max_duration(Duration::from_secs(2))
///     .with_jitter(Duration::from_millis(10));
///
/// assert_eq!(config.max_attempts(), 5);
/// assert_eq!(config.initial_delay(), Duration::from_millis(50));
/// assert_eq!(config.multiplier(), 3.0);
/// assert_eq!(config.max_delay(), Duration::from_secs(2));
/// assert_eq!(config.jitter(), Duration::from_millis(10));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryConfig {
    max_attempts: u32,
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
    jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryConfig {
    /// Same as [`RetryConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget, counting the first attempt.
    ///
    /// `with_max_attempts(3)` means one attempt plus up to two retries. A
    /// budget of zero is accepted here and reported as a
    /// [`ZeroAttempt`](crate::RetryErrorCause::ZeroAttempt) failure when the
    /// config is used.
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_duration(mut self, d: Duration) -> Self {
        self.initial_delay = d;
        self
    }

    /// Set the factor each successive delay grows by.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the cap on any single delay, jitter included.
    pub fn with_max_duration(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    /// Set the maximum jitter magnitude.
    ///
    /// Each delay is perturbed by a uniform offset in `[-jitter, +jitter]` and
    /// clamped back into `[0, max_delay]`. `Duration::ZERO` disables jitter.
    pub fn with_jitter(mut self, d: Duration) -> Self {
        self.jitter = d;
        self
    }

    /// Get the attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Get the delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Get the growth factor.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Get the delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Get the jitter bound.
    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Returns true if delays computed from this config are randomized.
    pub fn has_jitter(&self) -> bool {
        !self.jitter.is_zero()
    }
}

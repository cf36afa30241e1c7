//! Back-off configuration for connection establishment.

use std::time::Duration;

use rand::Rng;

/// Exponential back-off with jitter applied between dial attempts.
///
/// The delay before retry `n` (zero-based) is
/// `min(base_delay * multiplier^n, max_delay)`, scaled by a random factor
/// drawn from `[1 - jitter, 1 + jitter]`. Only connection establishment is
/// retried; requests are never re-sent.
///
/// # Default Values
/// - `base_delay`: 100 milliseconds
/// - `multiplier`: 1.6
/// - `max_delay`: 5 seconds
/// - `jitter`: 0.2
/// - `max_attempts`: 10
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffConfig {
    /// Delay used for the first retry after a failed dial.
    pub base_delay: Duration,
    /// Growth factor applied after each failed attempt.
    pub multiplier: f64,
    /// Ceiling on the un-jittered delay.
    pub max_delay: Duration,
    /// Fraction of the delay randomly added or removed.
    pub jitter: f64,
    /// Total dial attempts before giving up.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            multiplier: 1.6,
            max_delay: Duration::from_secs(5),
            jitter: 0.2,
            max_attempts: 10,
        }
    }
}

impl BackoffConfig {
    /// Clamp fields to sane bounds.
    ///
    /// Delays are at least 1 ms with `base_delay <= max_delay`, the
    /// multiplier is at least 1, jitter lies in `[0, 1]`, and at least one
    /// attempt is made.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use sreeify::transport::BackoffConfig;
    ///
    /// let cfg = BackoffConfig {
    ///     base_delay: Duration::from_millis(5),
    ///     max_delay: Duration::from_millis(1),
    ///     multiplier: 0.5,
    ///     jitter: 3.0,
    ///     max_attempts: 0,
    /// };
    ///
    /// let normalized = cfg.normalized();
    /// assert_eq!(normalized.base_delay, Duration::from_millis(1));
    /// assert_eq!(normalized.max_delay, Duration::from_millis(5));
    /// assert!((normalized.multiplier - 1.0).abs() < f64::EPSILON);
    /// assert!((normalized.jitter - 1.0).abs() < f64::EPSILON);
    /// assert_eq!(normalized.max_attempts, 1);
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.base_delay = self.base_delay.max(Duration::from_millis(1));
        self.max_delay = self.max_delay.max(Duration::from_millis(1));
        if self.base_delay > self.max_delay {
            std::mem::swap(&mut self.base_delay, &mut self.max_delay);
        }
        self.multiplier = if self.multiplier.is_finite() {
            self.multiplier.max(1.0)
        } else {
            1.0
        };
        self.jitter = if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.max_attempts = self.max_attempts.max(1);
        self
    }

    /// Un-jittered delay before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled)
    }

    /// Jittered delay before retry number `retry`.
    ///
    /// A jittered value too large for [`Duration`] saturates at `max_delay`.
    #[must_use]
    pub fn jittered(&self, retry: u32) -> Duration {
        let delay = self.delay_for(retry);
        if self.jitter <= 0.0 {
            return delay;
        }
        let factor = rand::thread_rng().gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(self.max_delay)
    }
}

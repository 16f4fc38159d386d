use std::time::Duration;

/// Fixed-interval bounded poll used while waiting for server-side praise
/// enrichment: the moment is created, then fetched every `interval` up to
/// `max_attempts` times until praise appears. No backoff; exhaustion falls
/// back to a canned offline praise line.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const DEFAULT: Self = Self {
        interval: Duration::from_secs(2),
        max_attempts: 10,
    };

    /// Longest a caller can end up waiting before giving up.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Exponential backoff for transient sync failures: the delay doubles from
/// `base` up to `cap`, for at most `max_retries` retries. Jitter is the
/// caller's concern.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    max_retries: u32,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, cap: Duration, max_retries: u32) -> Self {
        Self {
            base,
            cap,
            max_retries,
            attempt: 0,
        }
    }

    /// Delay before the next retry, or `None` once retries are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        let delay = self
            .base
            .checked_mul(1_u32.checked_shl(self.attempt).unwrap_or(u32::MAX))
            .unwrap_or(self.cap)
            .min(self.cap);
        self.attempt += 1;
        Some(delay)
    }

    #[must_use]
    pub fn attempts_made(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30), 5)
    }
}

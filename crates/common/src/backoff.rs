use rand::Rng;
use std::time::Duration;

/// Delay schedule between reconnection attempts.
///
/// The delay for attempt `n` is `min(max_delay, base * 2^n)`, widened by a
/// random jitter of up to `jitter_factor` of the delay in either direction.
/// With `base == max_delay` and no jitter the schedule is a constant delay,
/// which is what the streaming session uses.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
    jitter_factor: f64,
    attempt: u32,
}

impl ExponentialBackoff {
    /// Create a new backoff schedule.
    ///
    /// A `max_delay` below `base` is raised to `base`; a negative jitter is
    /// treated as none.
    pub fn new(base: Duration, max_delay: Duration, jitter_factor: f64) -> Self {
        Self {
            base,
            max_delay: max_delay.max(base),
            jitter_factor: jitter_factor.max(0.0),
            attempt: 0,
        }
    }

    /// The same delay before every attempt.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay, 0.0)
    }

    /// Delay before the next attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self
            .base
            .saturating_mul(2u32.saturating_pow(self.attempt))
            .min(self.max_delay);
        self.attempt = self.attempt.saturating_add(1);

        let spread = delay.as_secs_f64() * self.jitter_factor;
        if spread <= 0.0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
    }

    /// Number of delays handed out so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

//! Exponential backoff with jitter for reconnection loops.

use rand::Rng;
use std::time::Duration;

/// Doubling delay with a cap and proportional random jitter.
///
/// Jitter keeps a fleet of reconnecting clients from stampeding the server
/// at the same instant.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter: f64,
    attempt: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), 0.1)
    }
}

impl Backoff {
    /// `jitter` is a fraction of the delay in `[0, 1]`; negative values are
    /// treated as zero.
    pub fn new(base: Duration, max: Duration, jitter: f64) -> Self {
        Self {
            base,
            max,
            jitter: jitter.max(0.0),
            attempt: 0,
        }
    }

    /// Delay before the next attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let doubled = self.base.saturating_mul(2u32.saturating_pow(self.attempt));
        let capped = doubled.min(self.max);
        self.attempt = self.attempt.saturating_add(1);

        let spread = capped.as_secs_f64() * self.jitter;
        if spread == 0.0 {
            return capped;
        }
        let jittered = capped.as_secs_f64() + rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64(jittered.max(0.0))
    }

    /// Call after a healthy connection to start over from the base delay.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> Backoff {
        Backoff::new(Duration::from_secs(1), Duration::from_secs(8), 0.0)
    }

    #[test]
    fn test_doubles_until_cap() {
        let mut backoff = no_jitter();
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8]);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut backoff = no_jitter();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(60), 0.2);
        let secs = backoff.next_delay().as_secs_f64();
        assert!((8.0..=12.0).contains(&secs), "delay was {secs}");
    }

    #[test]
    fn test_negative_jitter_clamped() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(60), -1.0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }
}

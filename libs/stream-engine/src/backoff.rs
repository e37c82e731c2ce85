//! Exponential backoff with jitter between failed stream segments.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

/// Delay schedule for one subscription worker.
///
/// Retries are unbounded: a worker past preflight never gives up on its
/// topic, it only waits longer (up to `max_delay`).
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    attempt: u32,
    current: Duration,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        let current = config.initial_delay();
        Self {
            config,
            attempt: 0,
            current,
        }
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Back to the initial delay after a segment made progress.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current = self.config.initial_delay();
    }

    /// Delay before the next subscribe attempt; grows the schedule.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);

        let delay = if self.config.jitter {
            let factor = rand::thread_rng().gen_range(0.75..=1.25);
            scale(self.current, factor, self.current).max(Duration::from_millis(1))
        } else {
            self.current
        };

        let max = self.config.max_delay();
        self.current = scale(self.current, self.config.multiplier, max).min(max);

        delay
    }
}

/// `delay * factor`, or `fallback` when the product is not a valid `Duration`.
fn scale(delay: Duration, factor: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(jitter: bool) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2.0,
            jitter,
        }
    }

    #[test]
    fn grows_exponentially() {
        let mut backoff = Backoff::new(config(false));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn capped_at_max_delay() {
        let mut backoff = Backoff::new(config(false));
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(1_000));
    }

    #[test]
    fn reset_restarts_schedule() {
        let mut backoff = Backoff::new(config(false));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn huge_multiplier_saturates_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay_ms: 100,
            max_delay_ms: 30_000,
            multiplier: 1e30,
            jitter: false,
        };
        assert!(config.validate().is_ok());

        let mut backoff = Backoff::new(config);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(30_000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(30_000));
    }

    #[test]
    fn huge_multiplier_with_jitter_stays_bounded() {
        let mut backoff = Backoff::new(ReconnectConfig {
            initial_delay_ms: 100,
            max_delay_ms: 30_000,
            multiplier: f64::MAX,
            jitter: true,
        });
        for _ in 0..5 {
            assert!(backoff.next_delay() <= Duration::from_millis(37_500));
        }
    }

    #[test]
    fn jitter_stays_within_quarter() {
        let mut backoff = Backoff::new(config(true));
        for _ in 0..50 {
            backoff.reset();
            let d = backoff.next_delay();
            assert!(d >= Duration::from_millis(75), "{d:?}");
            assert!(d <= Duration::from_millis(125), "{d:?}");
        }
    }
}

//! Request pacing.
//!
//! Every outbound platform request is preceded by a delay that simulates a
//! human reading the page. This is deliberately not a backoff policy: the
//! delay never reacts to responses, and there is no retry anywhere in the
//! scrape path. Strategies are injectable so tests can run with no delay.

use std::time::Duration;

use rand::Rng;

/// Produces the pause inserted before each outbound request.
pub trait DelayStrategy: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// No pause at all. Used by tests and by callers that accept the risk.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayStrategy for NoDelay {
    fn next_delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// The same fixed pause before every request.
#[derive(Debug, Clone, Copy)]
pub struct ConstantDelay(pub Duration);

impl DelayStrategy for ConstantDelay {
    fn next_delay(&self) -> Duration {
        self.0
    }
}

/// A uniformly random pause within `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct JitteredDelay {
    min: Duration,
    max: Duration,
}

impl JitteredDelay {
    /// Swapped bounds are normalized rather than rejected.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

impl Default for JitteredDelay {
    /// Mirrors the 1-3 s window used when paging through platform results.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(3))
    }
}

impl DelayStrategy for JitteredDelay {
    fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let mut rng = rand::thread_rng();
        let micros = rng.gen_range(self.min.as_micros()..=self.max.as_micros());
        Duration::from_micros(micros as u64)
    }
}

/// A strategy chosen at runtime from configuration.
#[derive(Debug, Clone, Copy)]
pub enum ConfiguredDelay {
    None(NoDelay),
    Constant(ConstantDelay),
    Jittered(JitteredDelay),
}

impl DelayStrategy for ConfiguredDelay {
    fn next_delay(&self) -> Duration {
        match self {
            ConfiguredDelay::None(strategy) => strategy.next_delay(),
            ConfiguredDelay::Constant(strategy) => strategy.next_delay(),
            ConfiguredDelay::Jittered(strategy) => strategy.next_delay(),
        }
    }
}

/// Sleep for the strategy's next delay, skipping the timer for zero delays.
pub async fn pause(strategy: &dyn DelayStrategy) {
    let delay = strategy.next_delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_delay_is_zero() {
        assert_eq!(NoDelay.next_delay(), Duration::ZERO);
    }

    #[test]
    fn constant_delay_returns_its_duration() {
        let strategy = ConstantDelay(Duration::from_millis(250));
        assert_eq!(strategy.next_delay(), Duration::from_millis(250));
        assert_eq!(strategy.next_delay(), Duration::from_millis(250));
    }

    #[test]
    fn jittered_delay_stays_within_bounds() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(20);
        let strategy = JitteredDelay::new(min, max);
        for _ in 0..100 {
            let delay = strategy.next_delay();
            assert!(delay >= min && delay <= max, "delay {delay:?} out of bounds");
        }
    }

    #[test]
    fn jittered_delay_normalizes_swapped_bounds() {
        let strategy = JitteredDelay::new(Duration::from_secs(3), Duration::from_secs(1));
        let delay = strategy.next_delay();
        assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(3));
    }

    #[test]
    fn jittered_delay_with_equal_bounds_is_constant() {
        let strategy = JitteredDelay::new(Duration::from_millis(5), Duration::from_millis(5));
        assert_eq!(strategy.next_delay(), Duration::from_millis(5));
    }
}

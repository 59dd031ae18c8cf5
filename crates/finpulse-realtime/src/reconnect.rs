use std::time::Duration;

use rand::Rng;

/// Capped exponential backoff with jitter.
///
/// The nominal delay for attempt `n` is `initial_delay * factor^n`, capped at
/// `max_delay`. With `jitter = j` the actual delay is drawn from
/// `[base * (1 - j), base]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub jitter: f64,
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_delay.is_zero() {
            return Err("Initial reconnect delay must be > 0".to_string());
        }
        if self.max_delay.is_zero() {
            return Err("Max reconnect delay must be > 0".to_string());
        }
        if self.max_delay < self.initial_delay {
            return Err("Max reconnect delay must be >= initial reconnect delay".to_string());
        }
        if self.factor < 1.0 || !self.factor.is_finite() {
            return Err("Backoff factor must be >= 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter) || !self.jitter.is_finite() {
            return Err("Jitter must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(*self, attempt)
    }
}

pub(crate) fn nominal_backoff(config: BackoffConfig, attempt: u32) -> f64 {
    let initial = config.initial_delay.as_secs_f64();
    let max = config.max_delay.as_secs_f64();
    let exponent = config.factor.powf(f64::from(attempt));
    (initial * exponent).min(max)
}

pub(crate) fn calculate_backoff(config: BackoffConfig, attempt: u32) -> Duration {
    let base = nominal_backoff(config, attempt);

    if config.jitter == 0.0 {
        return Duration::from_secs_f64(base);
    }

    let mut rng = rand::rng();
    let randomized = rng.random_range(0.0..=base);
    let blended = base * (1.0 - config.jitter) + randomized * config.jitter;
    Duration::from_secs_f64(blended)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(jitter: f64) -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            jitter,
        }
    }

    #[test]
    fn grows_exponentially_until_cap() {
        let config = config(0.0);
        assert_eq!(config.delay(0), Duration::from_secs(1));
        assert_eq!(config.delay(1), Duration::from_secs(2));
        assert_eq!(config.delay(4), Duration::from_secs(16));
        assert_eq!(config.delay(5), Duration::from_secs(30));
        assert_eq!(config.delay(60), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_band() {
        let config = config(0.2);
        for attempt in 0..10 {
            let base = nominal_backoff(config, attempt);
            let delay = config.delay(attempt).as_secs_f64();
            assert!(delay <= base + 1e-9, "attempt {attempt}: {delay} > {base}");
            assert!(delay >= base * 0.8 - 1e-9, "attempt {attempt}: {delay} too small");
        }
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut bad = config(0.1);
        bad.factor = 0.5;
        assert_eq!(bad.validate().unwrap_err(), "Backoff factor must be >= 1.0");

        let mut bad = config(1.5);
        bad.factor = 2.0;
        assert_eq!(bad.validate().unwrap_err(), "Jitter must be between 0.0 and 1.0");

        let mut bad = config(0.1);
        bad.max_delay = Duration::from_millis(10);
        assert!(bad.validate().is_err());

        assert!(config(0.2).validate().is_ok());
    }
}

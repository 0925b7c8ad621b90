use std::time::Duration;

use rand::Rng;

use crate::config::BackoffConfig;

#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Upper bound of the next delay.
    pub fn ceiling(&self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt);

        self.config.base.saturating_mul(factor).min(self.config.cap)
    }

    pub fn next_delay(&mut self) -> Duration {
        let ceiling = self.ceiling().as_millis() as u64;
        self.attempt = self.attempt.saturating_add(1);

        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

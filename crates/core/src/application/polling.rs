// Retry-on-condition polling
use crate::domain::DomainError;
use crate::error::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

/// Pollers started by default
pub const DEFAULT_POLLERS: usize = 3;

/// Upper bound (inclusive) of each random draw
pub const DEFAULT_POLL_MAX_VALUE: u32 = 10;

/// Poll decision result
#[derive(Debug, PartialEq, Eq)]
pub enum PollDecision {
    /// Value cleared the threshold
    Accept(u32),
    /// Draw again after the given delay
    Retry(Duration),
    /// Attempt limit reached without clearing the threshold
    GiveUp,
}

/// Settings for a group of pollers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub pollers: usize,
    pub max_value: u32,
    pub time_unit: Duration,
    pub max_attempts: Option<u32>,
    pub seed: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            pollers: DEFAULT_POLLERS,
            max_value: DEFAULT_POLL_MAX_VALUE,
            time_unit: Duration::from_secs(1),
            max_attempts: None,
            seed: None,
        }
    }
}

impl PollConfig {
    /// Poller `idx` waits for a value above `max_value - idx - 1`, so there
    /// can be at most `max_value` pollers.
    pub fn validate(&self) -> std::result::Result<(), DomainError> {
        if self.pollers > self.max_value as usize {
            return Err(DomainError::ValidationError(format!(
                "at most {} pollers fit under max value {}",
                self.max_value, self.max_value
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(DomainError::ValidationError(
                "max_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Threshold for poller `idx`
    pub fn threshold_for(&self, idx: usize) -> u32 {
        self.max_value.saturating_sub(idx as u32 + 1)
    }
}

/// Outcome of one poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub idx: usize,
    pub threshold: u32,
    pub value: u32,
    pub attempts: u32,
}

/// Draws random values until one exceeds its threshold
///
/// Sleeps `(idx + 1)` time units between draws.
pub struct ThresholdPoller<R = StdRng> {
    idx: usize,
    threshold: u32,
    max_value: u32,
    retry_delay: Duration,
    max_attempts: Option<u32>,
    rng: R,
}

impl<R: Rng> ThresholdPoller<R> {
    /// Create a poller
    ///
    /// # Errors
    /// `DomainError::ValidationError` if `threshold >= max_value` (it could never finish)
    pub fn new(
        idx: usize,
        threshold: u32,
        max_value: u32,
        time_unit: Duration,
        max_attempts: Option<u32>,
        rng: R,
    ) -> std::result::Result<Self, DomainError> {
        if threshold >= max_value {
            return Err(DomainError::ValidationError(format!(
                "threshold {} leaves no value in 0..={} to accept",
                threshold, max_value
            )));
        }
        Ok(Self {
            idx,
            threshold,
            max_value,
            retry_delay: time_unit * (idx as u32 + 1),
            max_attempts,
            rng,
        })
    }

    /// Decide what to do with a drawn value after `attempts` draws
    pub fn decide(&self, value: u32, attempts: u32) -> PollDecision {
        if value > self.threshold {
            return PollDecision::Accept(value);
        }
        match self.max_attempts {
            Some(max) if attempts >= max => PollDecision::GiveUp,
            _ => PollDecision::Retry(self.retry_delay),
        }
    }

    /// Poll until the threshold is cleared
    ///
    /// # Errors
    /// `DomainError::PollExhausted` when the attempt limit is reached
    pub async fn run(mut self) -> Result<PollOutcome> {
        info!(
            idx = self.idx,
            threshold = self.threshold,
            "---> Poller {} started with threshold {}",
            self.idx,
            self.threshold
        );

        let mut attempts = 0;
        loop {
            let value = self.rng.gen_range(0..=self.max_value);
            attempts += 1;

            match self.decide(value, attempts) {
                PollDecision::Accept(value) => {
                    info!(idx = self.idx, value, attempts, "<--- Poller {} finished with {}", self.idx, value);
                    return Ok(PollOutcome {
                        idx: self.idx,
                        threshold: self.threshold,
                        value,
                        attempts,
                    });
                }
                PollDecision::Retry(delay) => {
                    info!(idx = self.idx, value, "Poller {} drew {}: too low; retrying", self.idx, value);
                    tokio::time::sleep(delay).await;
                }
                PollDecision::GiveUp => {
                    warn!(idx = self.idx, attempts, "Poller gave up");
                    return Err(DomainError::PollExhausted {
                        idx: self.idx,
                        attempts,
                    }
                    .into());
                }
            }
        }
    }
}

/// Run `config.pollers` pollers concurrently on the current task and gather
/// their outcomes in poller order
///
/// Each poller gets its own generator derived from `config.seed`. The first
/// failing poller fails the gather.
pub async fn poll_all(config: &PollConfig) -> Result<Vec<PollOutcome>> {
    let mut seeds = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    poll_all_with(config, |_| StdRng::seed_from_u64(seeds.gen())).await
}

/// Same as [`poll_all`], drawing from the generator `rng_for(idx)` returns
pub async fn poll_all_with<R, F>(config: &PollConfig, mut rng_for: F) -> Result<Vec<PollOutcome>>
where
    R: Rng,
    F: FnMut(usize) -> R,
{
    config.validate()?;

    let mut pollers = Vec::with_capacity(config.pollers);
    for idx in 0..config.pollers {
        let poller = ThresholdPoller::new(
            idx,
            config.threshold_for(idx),
            config.max_value,
            config.time_unit,
            config.max_attempts,
            rng_for(idx),
        )?;
        pollers.push(poller.run().instrument(info_span!("poller", idx)));
    }

    futures::future::try_join_all(pollers).await
}

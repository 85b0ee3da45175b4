// Pipeline configuration

use super::constants::*;
use super::delay::RandomDelay;
use crate::domain::DomainError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Queue pipeline settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub producers: usize,
    pub consumers: usize,
    pub max_items_per_producer: u32,
    pub delay: RandomDelay,
    /// `None` keeps the queue unbounded
    pub capacity: Option<usize>,
    /// `None` seeds from OS entropy
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producers: DEFAULT_PRODUCERS,
            consumers: DEFAULT_CONSUMERS,
            max_items_per_producer: MAX_ITEMS_PER_PRODUCER,
            delay: RandomDelay::new(MAX_DELAY_UNITS, DEFAULT_TIME_UNIT),
            capacity: None,
            seed: None,
        }
    }
}

impl PipelineConfig {
    pub fn new(producers: usize, consumers: usize) -> Self {
        Self {
            producers,
            consumers,
            ..Default::default()
        }
    }

    pub fn with_time_unit(mut self, unit: Duration) -> Self {
        self.delay.unit = unit;
        self
    }

    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items_per_producer = max_items;
        self
    }

    pub fn with_capacity(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Reject settings under which the queue could never drain
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.consumers == 0 && self.producers > 0 && self.max_items_per_producer > 0 {
            return Err(DomainError::ValidationError(
                "at least one consumer is required when producers may emit items".to_string(),
            ));
        }
        if self.capacity == Some(0) {
            return Err(DomainError::ValidationError(
                "capacity must be positive (omit it for an unbounded queue)".to_string(),
            ));
        }
        Ok(())
    }

    /// Root RNG from which every producer/consumer RNG is derived
    pub(crate) fn root_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

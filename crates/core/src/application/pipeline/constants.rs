// Pipeline constants (No magic values)
use std::time::Duration;

/// Producers spawned when none are requested explicitly
pub const DEFAULT_PRODUCERS: usize = 5;

/// Consumers spawned when none are requested explicitly
pub const DEFAULT_CONSUMERS: usize = 10;

/// Upper bound (inclusive) of the random batch size per producer
pub const MAX_ITEMS_PER_PRODUCER: u32 = 10;

/// Upper bound (inclusive) of a random pause, in time units
pub const MAX_DELAY_UNITS: u32 = 10;

/// Length of one time unit for random pauses (1s)
pub const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// Seed used by the demo when none is given
pub const DEFAULT_SEED: u64 = 444;

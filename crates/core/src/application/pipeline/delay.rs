// Random pause helper shared by producers, consumers and pollers

use rand::Rng;
use std::time::Duration;

/// Uniform random pause of `0..=max_units` time units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomDelay {
    pub max_units: u32,
    pub unit: Duration,
}

impl RandomDelay {
    pub fn new(max_units: u32, unit: Duration) -> Self {
        Self { max_units, unit }
    }

    /// Draw a pause; returns the unit count alongside the duration for logging
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (u32, Duration) {
        let units = rng.gen_range(0..=self.max_units);
        (units, self.unit * units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_stays_in_range() {
        let delay = RandomDelay::new(10, Duration::from_millis(5));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let (units, pause) = delay.sample(&mut rng);
            assert!(units <= 10);
            assert_eq!(pause, Duration::from_millis(5) * units);
        }
    }

    #[test]
    fn test_zero_max_units_never_sleeps() {
        let delay = RandomDelay::new(0, Duration::from_secs(1));
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(delay.sample(&mut rng), (0, Duration::ZERO));
    }
}

use std::time::Duration;

/// Physics step of the race host.
pub const DEFAULT_TICK: Duration = Duration::from_millis(20);

/// Longest wall-clock gap fed into the accumulator at once; a stalled host
/// catches up by at most this much.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    dt: Duration,
    accumulator: Duration,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl FixedTimestep {
    pub fn new(dt: Duration) -> Self {
        Self {
            dt: dt.max(Duration::from_millis(1)),
            accumulator: Duration::ZERO,
        }
    }

    pub fn dt(&self) -> Duration {
        self.dt
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator += delta.min(MAX_FRAME_DELTA);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.dt
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    /// Time left until the next whole tick.
    pub fn until_next(&self) -> Duration {
        self.dt.saturating_sub(self.accumulator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::default();

        ts.accumulate(Duration::from_millis(45));
        assert!(ts.should_tick());
        assert!(ts.consume_tick());
        assert!(ts.consume_tick());
        assert!(!ts.consume_tick());
        assert_eq!(ts.until_next(), Duration::from_millis(15));
    }

    #[test]
    fn stalls_are_clamped() {
        let mut ts = FixedTimestep::new(Duration::from_millis(20));
        ts.accumulate(Duration::from_secs(10));

        let mut ticks = 0;
        while ts.consume_tick() {
            ticks += 1;
        }
        assert_eq!(ticks, 12);
    }

    #[test]
    fn zero_interval_is_raised() {
        let ts = FixedTimestep::new(Duration::ZERO);
        assert_eq!(ts.dt(), Duration::from_millis(1));
    }
}

//! Simulated position and clock
//!
//! Position after step `n` is the straight-line interpolation at `n / steps`
//! plus the running sum of per-step jitter. Simulated time starts at the
//! configured start time and advances by a random whole number of seconds
//! per step.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use contracts::{Position, SimulationConfig};
use rand::Rng;

use crate::error::{Result, SimulatorError};

/// One advance of the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    /// 1-based step number
    pub step: u64,
    pub position: Position,
    pub timestamp: DateTime<Utc>,
}

/// Route interpolation plus simulated wall clock
#[derive(Debug, Clone)]
pub struct GeoClock {
    origin: Position,
    destination: Position,
    steps: u32,
    jitter: f64,
    min_step_secs: u32,
    max_step_secs: u32,

    step: u64,
    jitter_lat: f64,
    jitter_lon: f64,
    position: Position,
    now: DateTime<Utc>,
}

impl GeoClock {
    /// Clock positioned at the origin at `start`
    pub fn new(config: &SimulationConfig, start: DateTime<Utc>) -> Self {
        Self {
            origin: config.origin,
            destination: config.destination,
            steps: config.steps.max(1),
            jitter: config.jitter.max(0.0),
            min_step_secs: config.min_step_secs,
            max_step_secs: config.max_step_secs.max(config.min_step_secs),
            step: 0,
            jitter_lat: 0.0,
            jitter_lon: 0.0,
            position: config.origin,
            now: start,
        }
    }

    /// Clock starting at the configured start time, or now truncated to seconds
    pub fn from_config(config: &SimulationConfig) -> Self {
        let start = config
            .start_time
            .unwrap_or_else(|| Utc::now().trunc_subsecs(0));
        Self::new(config, start)
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Per-step increment of the noiseless path
    pub fn increment(&self) -> (f64, f64) {
        let steps = f64::from(self.steps);
        (
            (self.destination.latitude - self.origin.latitude) / steps,
            (self.destination.longitude - self.origin.longitude) / steps,
        )
    }

    /// Move one step along the route and forward in time
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<ClockTick> {
        let step = self.step + 1;

        if self.jitter > 0.0 {
            self.jitter_lat += rng.random_range(-self.jitter..=self.jitter);
            self.jitter_lon += rng.random_range(-self.jitter..=self.jitter);
        }

        let t = step as f64 / f64::from(self.steps);
        let position = Position::lerp(self.origin, self.destination, t)
            .offset(self.jitter_lat, self.jitter_lon);

        let gap = rng.random_range(self.min_step_secs..=self.max_step_secs);
        let now = self
            .now
            .checked_add_signed(TimeDelta::seconds(i64::from(gap)))
            .ok_or(SimulatorError::ClockOverflow { step })?;

        self.step = step;
        self.position = position;
        self.now = now;

        Ok(ClockTick {
            step,
            position,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BIRMINGHAM, LONDON};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(jitter: f64) -> SimulationConfig {
        SimulationConfig {
            jitter,
            start_time: Some("2024-01-01T00:00:00Z".parse().unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_noiseless_route_is_linear() {
        let config = config(0.0);
        let mut clock = GeoClock::from_config(&config);
        let mut rng = StdRng::seed_from_u64(1);
        let (d_lat, d_lon) = clock.increment();

        let first = clock.advance(&mut rng).unwrap();
        assert_eq!(first.step, 1);
        assert!((first.position.latitude - (LONDON.latitude + d_lat)).abs() < 1e-12);
        assert!((first.position.longitude - (LONDON.longitude + d_lon)).abs() < 1e-12);

        let mut last = first;
        for _ in 1..100 {
            last = clock.advance(&mut rng).unwrap();
        }
        assert_eq!(last.step, 100);
        assert_eq!(last.position, BIRMINGHAM);
    }

    #[test]
    fn test_time_gaps_within_bounds() {
        let config = config(0.001);
        let mut clock = GeoClock::from_config(&config);
        let mut rng = StdRng::seed_from_u64(7);

        let mut previous = clock.now();
        for _ in 0..200 {
            let tick = clock.advance(&mut rng).unwrap();
            let gap = (tick.timestamp - previous).num_seconds();
            assert!((30..=60).contains(&gap), "gap {gap} out of range");
            assert_eq!(tick.timestamp.timestamp_subsec_nanos(), 0);
            previous = tick.timestamp;
        }
    }

    #[test]
    fn test_step_jitter_is_bounded() {
        let config = config(0.001);
        let mut clock = GeoClock::from_config(&config);
        let mut rng = StdRng::seed_from_u64(42);
        let (d_lat, d_lon) = clock.increment();

        let mut previous = clock.position();
        for _ in 0..100 {
            let tick = clock.advance(&mut rng).unwrap();
            let lat_noise = tick.position.latitude - previous.latitude - d_lat;
            let lon_noise = tick.position.longitude - previous.longitude - d_lon;
            assert!(lat_noise.abs() <= 0.001 + 1e-9);
            assert!(lon_noise.abs() <= 0.001 + 1e-9);
            previous = tick.position;
        }
    }

    #[test]
    fn test_same_seed_same_path() {
        let config = config(0.001);
        let mut a = GeoClock::from_config(&config);
        let mut b = GeoClock::from_config(&config);
        let mut rng_a = StdRng::seed_from_u64(3);
        let mut rng_b = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            assert_eq!(a.advance(&mut rng_a).unwrap(), b.advance(&mut rng_b).unwrap());
        }
    }

    #[test]
    fn test_clock_overflow_is_an_error() {
        let config = config(0.0);
        let mut clock = GeoClock::new(&config, DateTime::<Utc>::MAX_UTC);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            clock.advance(&mut rng),
            Err(SimulatorError::ClockOverflow { step: 1 })
        ));
        assert_eq!(clock.step(), 0);
    }
}

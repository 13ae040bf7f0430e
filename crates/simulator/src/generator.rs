//! Correlated record generation
//!
//! Every step yields one record of each kind. The five records share the
//! step's timestamp, and those that carry a location share the step's
//! position.

use chrono::{DateTime, Utc};
use contracts::{
    EmergencyRecord, GpsRecord, IncidentStatus, IncidentType, Position, Record, RouteBoundary,
    SimulationConfig, TrafficRecord, VehicleProfile, VehicleRecord, WeatherCondition,
    WeatherRecord,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::geo_clock::{ClockTick, GeoClock};

/// The five records of one step
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecords {
    pub step: u64,
    pub vehicle: VehicleRecord,
    pub gps: GpsRecord,
    pub traffic: TrafficRecord,
    pub weather: WeatherRecord,
    pub emergency: EmergencyRecord,
}

impl StepRecords {
    /// Records in publish order
    pub fn into_records(self) -> [Record; 5] {
        [
            Record::Vehicle(self.vehicle),
            Record::Gps(self.gps),
            Record::Traffic(self.traffic),
            Record::Weather(self.weather),
            Record::Emergency(self.emergency),
        ]
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.vehicle.timestamp
    }

    pub fn position(&self) -> Position {
        self.vehicle.location
    }
}

/// Result of one generator step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Records(Box<StepRecords>),
    /// The vehicle reached (or passed) the destination; no records were produced
    EndOfRoute { step: u64, position: Position },
}

/// Produces correlated records along the route
#[derive(Debug)]
pub struct EventGenerator<R: Rng = StdRng> {
    clock: GeoClock,
    boundary: RouteBoundary,
    profile: VehicleProfile,
    rng: R,
    finished: bool,
}

impl EventGenerator<StdRng> {
    /// Generator seeded from config, or from OS entropy when no seed is set
    pub fn from_config(config: &SimulationConfig, profile: VehicleProfile) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(GeoClock::from_config(config), config, profile, rng)
    }
}

impl<R: Rng> EventGenerator<R> {
    pub fn new(clock: GeoClock, config: &SimulationConfig, profile: VehicleProfile, rng: R) -> Self {
        Self {
            clock,
            boundary: RouteBoundary::new(config.origin, config.destination),
            profile,
            rng,
            finished: false,
        }
    }

    pub fn clock(&self) -> &GeoClock {
        &self.clock
    }

    /// Whether the end of the route has been reported
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance one step and build its records
    ///
    /// Once the destination is reached every further call returns
    /// `EndOfRoute` without touching the clock.
    pub fn step(&mut self, device_id: &str) -> Result<StepOutcome> {
        if self.finished {
            return Ok(StepOutcome::EndOfRoute {
                step: self.clock.step(),
                position: self.clock.position(),
            });
        }

        let tick = self.clock.advance(&mut self.rng)?;

        if self.boundary.has_arrived(tick.position) {
            self.finished = true;
            info!(
                step = tick.step,
                position = %tick.position,
                "vehicle reached destination"
            );
            return Ok(StepOutcome::EndOfRoute {
                step: tick.step,
                position: tick.position,
            });
        }

        let records = self.build(device_id, &tick);
        debug!(step = tick.step, position = %tick.position, timestamp = %tick.timestamp, "step generated");
        Ok(StepOutcome::Records(Box::new(records)))
    }

    fn build(&mut self, device_id: &str, tick: &ClockTick) -> StepRecords {
        let profile = &self.profile;
        let rng = &mut self.rng;

        let vehicle = VehicleRecord {
            id: random_uuid(rng),
            device_id: device_id.to_string(),
            timestamp: tick.timestamp,
            location: tick.position,
            speed: rng.random_range(10.0..=40.0),
            direction: profile.direction.clone(),
            make: profile.make.clone(),
            model: profile.model.clone(),
            year: profile.year,
            fuel_type: profile.fuel_type.clone(),
        };

        let gps = GpsRecord {
            id: random_uuid(rng),
            device_id: device_id.to_string(),
            timestamp: tick.timestamp,
            speed: rng.random_range(0.0..=40.0),
            direction: profile.direction.clone(),
            vehicle_type: profile.vehicle_type.clone(),
        };

        let traffic = TrafficRecord {
            id: random_uuid(rng),
            device_id: device_id.to_string(),
            camera_id: profile.camera_id.clone(),
            timestamp: tick.timestamp,
            location: tick.position,
            snapshot: profile.snapshot.clone(),
        };

        let weather = WeatherRecord {
            id: random_uuid(rng),
            device_id: device_id.to_string(),
            location: tick.position,
            timestamp: tick.timestamp,
            temperature: rng.random_range(-5.0..=30.0),
            weather_condition: pick(rng, &WeatherCondition::ALL),
            precipitation: rng.random_range(0.0..=25.0),
            wind_speed: rng.random_range(0.0..=100.0),
            humidity: rng.random_range(0..=100),
            air_quality_index: rng.random_range(0.0..=500.0),
        };

        let emergency = EmergencyRecord {
            id: random_uuid(rng),
            device_id: device_id.to_string(),
            incident_id: random_uuid(rng),
            incident_type: pick(rng, &IncidentType::ALL),
            timestamp: tick.timestamp,
            location: tick.position,
            status: pick(rng, &IncidentStatus::ALL),
            description: profile.incident_description.clone(),
        };

        StepRecords {
            step: tick.step,
            vehicle,
            gps,
            traffic,
            weather,
            emergency,
        }
    }
}

/// Version 4 UUID drawn from the generator's RNG
fn random_uuid<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid()
}

fn pick<T: Copy, R: Rng + ?Sized, const N: usize>(rng: &mut R, values: &[T; N]) -> T {
    values[rng.random_range(0..N)]
}

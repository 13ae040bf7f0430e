//! # Simulator
//!
//! Vehicle journey simulation.
//!
//! - `GeoClock`: position along the route and simulated time
//! - `EventGenerator`: five correlated records per step
//! - `Publisher`: keyed, detached delivery to a `Transport`
//! - `Journey`: paced loop tying the three together

pub mod error;
pub mod generator;
pub mod geo_clock;
pub mod journey;
pub mod publisher;

pub use error::{Result, SimulatorError};
pub use generator::{EventGenerator, StepOutcome, StepRecords};
pub use geo_clock::{ClockTick, GeoClock};
pub use journey::{Journey, JourneyConfig, JourneyOutcome, JourneySummary};
pub use publisher::{DeliveryHandle, Publisher, PublisherMetrics, PublisherSnapshot};

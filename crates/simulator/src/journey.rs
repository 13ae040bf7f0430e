//! Journey loop
//!
//! Drives the generator step by step, publishes each step's records to their
//! topics and paces the loop in wall-clock time. Stops on arrival, on the
//! optional step limit, or when the shutdown flag is raised.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{PipelineBlueprint, Position, TopicsConfig, Transport};
use rand::Rng;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::generator::{EventGenerator, StepOutcome};
use crate::publisher::{Publisher, PublisherSnapshot};

/// Journey settings
#[derive(Debug, Clone)]
pub struct JourneyConfig {
    pub device_id: String,
    pub topics: TopicsConfig,
    /// Wall-clock pause between steps
    pub pacing: Duration,
    /// Stop after this many published steps
    pub max_steps: Option<u64>,
}

impl JourneyConfig {
    pub fn from_blueprint(blueprint: &PipelineBlueprint) -> Self {
        Self {
            device_id: blueprint.simulation.device_id.clone(),
            topics: blueprint.topics.clone(),
            pacing: Duration::from_millis(blueprint.simulation.pacing_ms),
            max_steps: blueprint.simulation.max_steps,
        }
    }
}

/// Why the journey stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JourneyOutcome {
    Arrived,
    StepLimit,
    Interrupted,
}

impl std::fmt::Display for JourneyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JourneyOutcome::Arrived => write!(f, "arrived"),
            JourneyOutcome::StepLimit => write!(f, "step limit reached"),
            JourneyOutcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Journey statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JourneySummary {
    pub outcome: JourneyOutcome,
    /// Steps whose records were published
    pub steps: u64,
    pub publish: PublisherSnapshot,
    pub final_position: Position,
    pub final_time: DateTime<Utc>,
}

impl std::fmt::Display for JourneySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Journey Summary ===")?;
        writeln!(f, "Outcome: {}", self.outcome)?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(
            f,
            "Records: {} submitted, {} delivered, {} failed",
            self.publish.submitted, self.publish.delivered, self.publish.failed
        )?;
        writeln!(f, "Final position: {}", self.final_position)?;
        write!(f, "Final time: {}", self.final_time.to_rfc3339())
    }
}

/// Generator and publisher bound to one device
pub struct Journey<T, R: Rng> {
    config: JourneyConfig,
    generator: EventGenerator<R>,
    publisher: Publisher<T>,
}

impl<T: Transport + Sync + 'static, R: Rng> Journey<T, R> {
    pub fn new(config: JourneyConfig, generator: EventGenerator<R>, transport: Arc<T>) -> Self {
        Self {
            config,
            generator,
            publisher: Publisher::new(transport),
        }
    }

    /// Run until arrival, step limit or shutdown
    ///
    /// Outstanding deliveries are flushed before returning, including when
    /// generation fails.
    #[instrument(name = "journey_run", skip(self, shutdown), fields(device_id = %self.config.device_id))]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<JourneySummary> {
        let mut steps = 0u64;
        info!(start = %self.generator.clock().now().to_rfc3339(), "journey started");

        let outcome = loop {
            if *shutdown.borrow() {
                break JourneyOutcome::Interrupted;
            }
            if self.config.max_steps.is_some_and(|max| steps >= max) {
                break JourneyOutcome::StepLimit;
            }

            let step = match self.generator.step(&self.config.device_id) {
                Ok(StepOutcome::Records(step)) => step,
                Ok(StepOutcome::EndOfRoute { .. }) => break JourneyOutcome::Arrived,
                Err(e) => {
                    error!(error = %e, "generation failed, stopping journey");
                    self.publisher.flush().await;
                    return Err(e);
                }
            };

            let step_no = step.step;
            for record in (*step).into_records() {
                let topic = self.config.topics.topic_for(record.kind());
                if let Err(e) = self.publisher.publish(topic, &record) {
                    warn!(step = step_no, topic = %topic, error = %e, "record not published");
                }
            }
            steps += 1;
            observability::record_journey_step(step_no);
            self.publisher.reap();

            pause(self.config.pacing, &mut shutdown).await;
        };

        self.publisher.flush().await;

        let summary = JourneySummary {
            outcome,
            steps,
            publish: self.publisher.metrics().snapshot(),
            final_position: self.generator.clock().position(),
            final_time: self.generator.clock().now(),
        };
        info!(
            outcome = %summary.outcome,
            steps = summary.steps,
            delivered = summary.publish.delivered,
            failed = summary.publish.failed,
            "journey finished"
        );
        Ok(summary)
    }
}

/// Sleep for `pacing`, returning early if shutdown is requested
async fn pause(pacing: Duration, shutdown: &mut watch::Receiver<bool>) {
    if pacing.is_zero() {
        return;
    }
    let stop_requested = async {
        if shutdown.wait_for(|stop| *stop).await.is_err() {
            // Sender gone: nobody can ask us to stop early
            std::future::pending::<()>().await;
        }
    };
    let _ = tokio::time::timeout(pacing, stop_requested).await;
}

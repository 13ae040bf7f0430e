//! Configuration resolution: file or defaults, then command-line overrides.

use config_loader::ConfigLoader;
use contracts::PipelineBlueprint;
use tracing::info;

use crate::cli::{ConfigArgs, JourneyArgs};
use crate::error::{CliError, Result};

/// Load the blueprint named by `args` and apply its overrides
///
/// The result is validated again after overrides are applied.
pub fn load_blueprint(args: &ConfigArgs) -> Result<PipelineBlueprint> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()));
        }
        info!(config = %path.display(), "Loading configuration");
    } else {
        info!("No configuration file given, using defaults");
    }

    let mut blueprint = ConfigLoader::load_or_default(args.config.as_deref())?;
    apply_config_overrides(&mut blueprint, args);
    ConfigLoader::validate(&blueprint)?;
    Ok(blueprint)
}

fn apply_config_overrides(blueprint: &mut PipelineBlueprint, args: &ConfigArgs) {
    if let Some(address) = &args.transport {
        info!(address = %address, "Overriding transport address");
        blueprint.transport.address = address.clone();
    }

    let topics = &mut blueprint.topics;
    for (slot, value) in [
        (&mut topics.vehicle, &args.vehicle_topic),
        (&mut topics.gps, &args.gps_topic),
        (&mut topics.traffic, &args.traffic_topic),
        (&mut topics.weather, &args.weather_topic),
        (&mut topics.emergency, &args.emergency_topic),
    ] {
        if let Some(name) = value {
            info!(from = %slot, to = %name, "Overriding topic name");
            *slot = name.clone();
        }
    }

    if let Some(output) = &args.output {
        info!(output = %output.display(), "Overriding storage path");
        blueprint.storage.base_path = output.clone();
    }
}

/// Apply journey overrides on top of a loaded blueprint
pub fn apply_journey_overrides(blueprint: &mut PipelineBlueprint, args: &JourneyArgs) {
    let simulation = &mut blueprint.simulation;
    if args.seed.is_some() {
        simulation.seed = args.seed;
    }
    if args.max_steps.is_some() {
        simulation.max_steps = args.max_steps;
    }
    if let Some(pacing_ms) = args.pacing_ms {
        simulation.pacing_ms = pacing_ms;
    }
}

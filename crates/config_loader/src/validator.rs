//! Configuration validation
//!
//! Rules:
//! - topic names distinct and usable as a path segment
//! - route endpoints finite, in range and distinct
//! - steps > 0, jitter >= 0, 1 <= min_step_secs <= max_step_secs
//! - ingestion batch size and poll interval > 0
//! - storage base path set, retry backoff bounds ordered
//! - transport address parseable

use std::collections::HashSet;

use contracts::{check_topic_name, ContractError, PipelineBlueprint, Position};

/// Validate a PipelineBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    validate_transport(blueprint)?;
    validate_topics(blueprint)?;
    validate_route(blueprint)?;
    validate_clock(blueprint)?;
    validate_ingestion(blueprint)?;
    validate_storage(blueprint)?;
    Ok(())
}

fn validate_transport(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    blueprint.transport.parse_address().map(|_| ())
}

/// Topic names must be unique and safe as file and object path segments
fn validate_topics(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (kind, topic) in blueprint.topics.iter() {
        check_topic_name(topic)
            .map_err(|message| ContractError::config_validation(format!("topics.{kind}"), message))?;
        if !seen.insert(topic) {
            return Err(ContractError::config_validation(
                format!("topics.{kind}"),
                format!("duplicate topic name '{topic}'"),
            ));
        }
    }
    Ok(())
}

fn validate_position(field: &str, position: &Position) -> Result<(), ContractError> {
    if !position.is_finite() || !position.in_range() {
        return Err(ContractError::config_validation(
            field,
            format!("coordinates out of range: {position}"),
        ));
    }
    Ok(())
}

fn validate_route(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let sim = &blueprint.simulation;

    if sim.device_id.trim().is_empty() {
        return Err(ContractError::config_validation(
            "simulation.device_id",
            "device_id cannot be empty",
        ));
    }

    validate_position("simulation.origin", &sim.origin)?;
    validate_position("simulation.destination", &sim.destination)?;

    if sim.origin == sim.destination {
        return Err(ContractError::config_validation(
            "simulation.origin / simulation.destination",
            "origin and destination must differ",
        ));
    }

    if sim.steps == 0 {
        return Err(ContractError::config_validation(
            "simulation.steps",
            "steps must be > 0",
        ));
    }

    if !sim.jitter.is_finite() || sim.jitter < 0.0 {
        return Err(ContractError::config_validation(
            "simulation.jitter",
            format!("jitter must be >= 0, got {}", sim.jitter),
        ));
    }

    if sim.max_steps == Some(0) {
        return Err(ContractError::config_validation(
            "simulation.max_steps",
            "max_steps must be > 0 when set",
        ));
    }

    Ok(())
}

/// Simulated time advance bounds
fn validate_clock(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let sim = &blueprint.simulation;

    if sim.min_step_secs == 0 {
        return Err(ContractError::config_validation(
            "simulation.min_step_secs",
            "min_step_secs must be >= 1 so timestamps strictly increase",
        ));
    }

    if sim.min_step_secs > sim.max_step_secs {
        return Err(ContractError::config_validation(
            "simulation.min_step_secs / simulation.max_step_secs",
            format!(
                "min_step_secs ({}) must be <= max_step_secs ({})",
                sim.min_step_secs, sim.max_step_secs
            ),
        ));
    }

    Ok(())
}

fn validate_ingestion(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let ingestion = &blueprint.ingestion;

    if ingestion.max_batch_records == 0 {
        return Err(ContractError::config_validation(
            "ingestion.max_batch_records",
            "max_batch_records must be > 0",
        ));
    }

    if ingestion.poll_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "ingestion.poll_interval_ms",
            "poll_interval_ms must be > 0",
        ));
    }

    Ok(())
}

fn validate_storage(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let storage = &blueprint.storage;

    if storage.base_path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "storage.base_path",
            "base_path cannot be empty",
        ));
    }

    if storage.retry_initial_backoff_ms == 0 {
        return Err(ContractError::config_validation(
            "storage.retry_initial_backoff_ms",
            "retry_initial_backoff_ms must be > 0",
        ));
    }

    if storage.retry_initial_backoff_ms > storage.retry_max_backoff_ms {
        return Err(ContractError::config_validation(
            "storage.retry_initial_backoff_ms / storage.retry_max_backoff_ms",
            format!(
                "retry_initial_backoff_ms ({}) must be <= retry_max_backoff_ms ({})",
                storage.retry_initial_backoff_ms, storage.retry_max_backoff_ms
            ),
        ));
    }

    Ok(())
}

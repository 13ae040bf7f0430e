//! # Integration Tests
//!
//! End-to-end scenarios across the workspace.
//!
//! Covers:
//! - Configuration snapshot of the shipped example
//! - Journey to Parquet over a shared in-memory transport
//! - Crash and restart with exactly-once output
//! - Record streams through transport, reader and schema validation

#[cfg(test)]
mod support;

#[cfg(test)]
mod contract_tests {
    use std::path::Path;

    use config_loader::ConfigLoader;
    use contracts::{PipelineBlueprint, BIRMINGHAM, LONDON};

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../smart-city.toml");
        let blueprint = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(blueprint.simulation.origin, LONDON);
        assert_eq!(blueprint.simulation.destination, BIRMINGHAM);
        assert_eq!(blueprint.simulation.seed, Some(42));
        assert_eq!(blueprint.topics, PipelineBlueprint::default().topics);
    }

    #[test]
    fn test_default_blueprint_round_trips_through_toml() {
        let blueprint = PipelineBlueprint::default();
        let text = ConfigLoader::to_toml(&blueprint).unwrap();
        let parsed =
            ConfigLoader::load_from_str(&text, config_loader::ConfigFormat::Toml).unwrap();
        assert_eq!(parsed.topics, blueprint.topics);
        assert_eq!(parsed.simulation.steps, 100);
        assert_eq!(parsed.storage.base_path, blueprint.storage.base_path);
    }
}

#[cfg(test)]
mod e2e_tests;

#[cfg(test)]
mod recovery_tests;

#[cfg(test)]
mod stream_tests;

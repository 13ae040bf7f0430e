//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{PipelineBlueprint, TransportAddress};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    transport: String,
    topics: Vec<String>,
    device_id: String,
    route: String,
    steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    storage: String,
    compression: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&blueprint)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(blueprint: &PipelineBlueprint) -> ConfigSummary {
    let sim = &blueprint.simulation;
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        transport: blueprint.transport.address.clone(),
        topics: blueprint.topics.iter().map(|(_, t)| t.to_string()).collect(),
        device_id: sim.device_id.clone(),
        route: format!("{} -> {}", sim.origin, sim.destination),
        steps: sim.steps,
        seed: sim.seed,
        storage: blueprint.storage.base_path.display().to_string(),
        compression: format!("{:?}", blueprint.storage.compression),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &PipelineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.transport.parse_address().ok() == Some(TransportAddress::Memory) {
        warnings.push(
            "transport is memory:// - only the `run` command shares it between producer and pipelines"
                .to_string(),
        );
    }

    if blueprint.simulation.seed.is_none() {
        warnings.push("simulation.seed is not set - journeys are not reproducible".to_string());
    }

    if blueprint.simulation.pacing_ms == 0 {
        warnings.push("simulation.pacing_ms is 0 - the journey runs unpaced".to_string());
    }

    if blueprint.ingestion.watermark_delay_secs == 0 {
        warnings.push(
            "ingestion.watermark_delay_secs is 0 - any out-of-order record is flagged late"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Transport: {}", summary.transport);
            println!("  Topics: {}", summary.topics.join(", "));
            println!("  Device: {}", summary.device_id);
            println!("  Route: {} ({} steps)", summary.route, summary.steps);
            if let Some(seed) = summary.seed {
                println!("  Seed: {}", seed);
            }
            println!("  Storage: {} ({})", summary.storage, summary.compression);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = config_file("[transport]\naddress = \"memory://\"\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });

        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("memory://")));
        assert!(warnings.iter().any(|w| w.contains("seed")));
        assert_eq!(result.summary.unwrap().topics.len(), 5);
    }

    #[test]
    fn test_invalid_config_names_field() {
        let file = config_file("[simulation]\nsteps = 0\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });

        assert!(!result.valid);
        assert!(result.error.unwrap().contains("simulation.steps"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/smart-city.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.summary.is_none());
    }
}

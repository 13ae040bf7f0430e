//! `schemas` command implementation.

use anyhow::{Context, Result};
use contracts::Schema;
use schema_registry::SchemaRegistry;

use crate::cli::SchemasArgs;
use crate::error::CliError;
use crate::runtime::load_blueprint;

/// Execute the `schemas` command
pub fn run_schemas(args: &SchemasArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let registry = SchemaRegistry::new(&blueprint.topics).map_err(CliError::from)?;

    if args.json {
        let schemas: Vec<&Schema> = registry.schemas().map(|s| s.as_ref()).collect();
        let json = serde_json::to_string_pretty(&schemas).context("Failed to serialize schemas")?;
        println!("{}", json);
    } else {
        for schema in registry.schemas() {
            print_schema(schema);
        }
    }
    Ok(())
}

fn print_schema(schema: &Schema) {
    println!("\n{} ({} records)", schema.topic(), schema.kind());
    for field in schema.fields() {
        let marker = if field.name == schema.event_time_field() {
            "  [event time]"
        } else {
            ""
        };
        println!(
            "  {:<16} {}{}{}",
            field.name,
            field.semantic_type,
            if field.nullable { " (nullable)" } else { "" },
            marker
        );
    }
}

//! Command implementations.

mod ingest;
mod run;
mod schemas;
mod simulate;
mod validate;

pub use ingest::run_ingest;
pub use run::run_pipeline;
pub use schemas::run_schemas;
pub use simulate::run_simulate;
pub use validate::run_validate;

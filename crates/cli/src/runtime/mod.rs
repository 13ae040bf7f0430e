//! Shared plumbing for the running commands.

mod report;
mod settings;
mod shutdown;

pub use report::IngestReport;
pub use settings::{apply_journey_overrides, load_blueprint};
pub use shutdown::{shutdown_flag, shutdown_signal, wait_for_flag};

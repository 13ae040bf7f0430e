//! Pipeline run control
//!
//! Pipelines watch a shared `RunState`. They only act on it between batches
//! and between retry attempts, so a batch is never cut in half.

use std::time::Duration;

use tokio::sync::watch;

/// Requested pipeline state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    /// Keep polling, wait when caught up
    #[default]
    Running,
    /// Exit once caught up with the topic
    Drain,
    /// Exit at the next batch boundary
    Stop,
}

/// Sleep for `delay`; returns true if a stop was requested meanwhile
///
/// A dropped sender counts as a stop request.
pub async fn sleep_unless_stopped(delay: Duration, control: &mut watch::Receiver<RunState>) -> bool {
    let stopped = async {
        let _ = control.wait_for(|state| *state == RunState::Stop).await;
    };
    tokio::time::timeout(delay, stopped).await.is_ok()
}

/// Sleep for `delay`, waking early on any state change
///
/// Returns false once the sender is gone.
pub async fn sleep_until_changed(delay: Duration, control: &mut watch::Receiver<RunState>) -> bool {
    !matches!(
        tokio::time::timeout(delay, control.changed()).await,
        Ok(Err(_))
    )
}

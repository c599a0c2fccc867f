use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::state::AppState;

/// Start the hold-expiry sweeper for the lifetime of the server. Flip the
/// shutdown flag to stop it.
pub fn start_expiry_worker(
    state: &AppState,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    info!("Expiry worker started, sweeping every {:?}", interval);
    Arc::new(state.sweeper(interval)).start(shutdown)
}

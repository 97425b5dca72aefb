use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db;
use crate::state::SharedState;

pub const INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Spawns the housekeeping loop: expired sessions and idle rate-limit
/// windows are dropped every [`INTERVAL`] until shutdown is signalled.
pub fn spawn(state: SharedState, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(run(state, shutdown, INTERVAL))
}

async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>, interval: Duration) {
    tracing::info!("Maintenance task started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        if let Err(e) = sweep(&state).await {
            tracing::error!("Maintenance sweep failed: {e}");
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::info!("Maintenance task stopped");
}

/// One housekeeping pass. Returns the number of sessions removed.
pub async fn sweep(state: &SharedState) -> Result<u64, String> {
    let removed = db::sessions::delete_expired(&state.pool)
        .await
        .map_err(|e| format!("Failed to purge expired sessions: {e}"))?;

    let before = state.limiter.tracked();
    state.limiter.cleanup();
    let after = state.limiter.tracked();

    if removed > 0 || before != after {
        tracing::debug!(
            sessions = removed,
            limiter_entries = before.saturating_sub(after),
            "Maintenance sweep"
        );
    }

    Ok(removed)
}

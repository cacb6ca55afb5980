//! Periodic reclamation of rooms nobody is in anymore.

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::state::SharedState;

/// Remove empty rooms older than the configured TTL on every cleanup tick.
pub async fn run(state: SharedState) {
    let settings = state.config().rooms();
    let mut ticker = interval(settings.cleanup_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        sweep(&state);
    }
}

/// Run one cleanup pass. Returns how many rooms were removed.
pub fn sweep(state: &SharedState) -> usize {
    let removed = state.rooms().cleanup_empty_rooms();
    if removed > 0 {
        info!(removed, remaining = state.rooms().len(), "empty rooms reclaimed");
    } else {
        debug!("no empty rooms to reclaim");
    }
    removed
}

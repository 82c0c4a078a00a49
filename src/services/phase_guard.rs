//! Time-driven phase reconciler.
//!
//! The guard is a catch-up mechanism, not a precise timer: it polls at a
//! short fixed interval, compares the clock against the scheduled thresholds,
//! and performs at most the earliest due transition per pass. Because the
//! thresholds are monotonic and checked in schedule order, an arbitrarily
//! slow cadence delays transitions but never skips a phase.

use std::time::Duration;

use serde_json::json;
use tokio::time::{self, MissedTickBehavior};
use tracing::warn;

use crate::{
    error::ServiceError,
    services::{scoring, sse_events},
    state::{SharedState, round::Phase},
    store::keys,
};

/// Poll the round schedule forever, advancing due phases.
///
/// Store failures abandon the pass; the next interval tick retries naturally.
pub async fn run_phase_guard(state: SharedState) {
    let mut interval = time::interval(Duration::from_millis(state.config().guard_interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(err) = reconcile(&state).await {
            warn!(error = %err, "phase guard pass failed");
        }
    }
}

/// Perform the earliest due transition, if any.
pub async fn reconcile(state: &SharedState) -> Result<(), ServiceError> {
    let round = state.round_state().await?;
    let now = state.clock().now_ms();
    let Some(next) = round.due_transition(now) else {
        return Ok(());
    };

    let key = keys::round_state(state.game_id());
    state
        .store()
        .update(&key, json!({"phase": next, "updated_at": now}))
        .await?;

    let updated = state.round_state().await?;
    sse_events::broadcast_phase_changed(state, &updated);

    // The window closed: settle the round even when nobody buzzed, so the
    // summary and any eliminations are produced exactly once.
    if next == Phase::Locked {
        if let Some(round_id) = round.active_round_id.as_deref() {
            scoring::finalize_round(state, round_id).await?;
        }
    }

    Ok(())
}

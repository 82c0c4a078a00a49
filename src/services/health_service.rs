use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState, store::keys};

/// Probe the round store with a cheap read and report health accordingly.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.store().get(&keys::round_state(state.game_id())).await {
        Ok(_) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "round store probe failed");
            HealthResponse::degraded()
        }
    }
}

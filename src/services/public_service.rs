//! Read-only projections served to every client.

use crate::{
    dto::public::{RoundResultResponse, RoundSnapshot},
    error::ServiceError,
    state::{SharedState, models::RoundSummary, models::decode},
    store::keys,
};

/// Current round snapshot for rendering.
pub async fn round_snapshot(state: &SharedState) -> Result<RoundSnapshot, ServiceError> {
    let round = state.round_state().await?;
    Ok(RoundSnapshot::new(state.game_id(), &round))
}

/// Result rows of the most recently started round, once it has been decided.
pub async fn last_round_result(state: &SharedState) -> Result<RoundResultResponse, ServiceError> {
    let round = state.round_state().await?;
    let Some(round_id) = round.active_round_id.as_deref() else {
        return Err(ServiceError::NotFound("no round has been played yet".into()));
    };

    let key = keys::round_summary(state.game_id(), round_id);
    let value = state
        .store()
        .get(&key)
        .await?
        .ok_or_else(|| ServiceError::NotFound("the current round is not decided yet".into()))?;
    let summary = decode::<RoundSummary>(&key, value)
        .ok_or_else(|| ServiceError::NotFound("the round summary is malformed".into()))?;

    Ok(summary.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, clock::ManualClock, round::Phase, round::RoundState},
        store::{RoundStore, memory::MemoryStore},
    };

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            Uuid::new_v4(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::at(1_000)),
        )
    }

    #[tokio::test]
    async fn snapshot_of_a_fresh_session_is_register() {
        let state = test_state();
        let snapshot = round_snapshot(&state).await.unwrap();
        assert_eq!(snapshot.phase, Phase::Register);
        assert_eq!(snapshot.round_number, 0);
        assert!(snapshot.active_round_id.is_none());
    }

    #[tokio::test]
    async fn result_is_not_found_before_any_decision() {
        let state = test_state();
        assert!(matches!(
            last_round_result(&state).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));

        let round = RoundState {
            phase: Phase::Live,
            active_round_id: Some("r1".into()),
            round_number: 1,
            ..RoundState::default()
        };
        state
            .store()
            .set(
                &keys::round_state(state.game_id()),
                serde_json::to_value(&round).unwrap(),
            )
            .await
            .unwrap();

        assert!(matches!(
            last_round_result(&state).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn decided_round_result_is_served() {
        let state = test_state();
        let round = RoundState {
            phase: Phase::Locked,
            active_round_id: Some("r1".into()),
            round_number: 1,
            ..RoundState::default()
        };
        state
            .store()
            .set(
                &keys::round_state(state.game_id()),
                serde_json::to_value(&round).unwrap(),
            )
            .await
            .unwrap();

        let summary = RoundSummary {
            round_id: "r1".into(),
            round_number: 1,
            winner_id: None,
            victory_chant: None,
            winner_reaction_ms: None,
            attempts: Vec::new(),
            decided_at: 1_700_000_000_000,
        };
        state
            .store()
            .set(
                &keys::round_summary(state.game_id(), "r1"),
                serde_json::to_value(&summary).unwrap(),
            )
            .await
            .unwrap();

        let result = last_round_result(&state).await.unwrap();
        assert_eq!(result.summary.round_id, "r1");
        assert!(result.decided_at_display.starts_with("2023-"));
    }
}

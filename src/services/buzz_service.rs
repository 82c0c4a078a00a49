//! Buzz arbitration against the shared per-round keys.
//!
//! Both writes here are create-if-absent: the player's own attempt (at most
//! one per round) and the shared winner record (first writer across all
//! players wins). "First" is defined by write arrival order at the store,
//! never by comparing timestamps, so arbitration stays correct under clock
//! skew between players.

use uuid::Uuid;

use crate::{
    dto::player::BuzzResponse,
    error::ServiceError,
    state::{
        SharedState,
        models::{Attempt, PlayerRecord, WinnerRecord, decode},
        round::{Phase, RoundState},
    },
    store::{StoreError, create_if_absent, keys},
};

/// Handle one buzz input from a player.
pub async fn buzz(state: &SharedState, player_id: Uuid) -> Result<BuzzResponse, ServiceError> {
    let player = load_player(state, player_id).await?;
    if player.eliminated.is_some() {
        return Err(ServiceError::InvalidState(
            "you have been eliminated from this game".into(),
        ));
    }

    let round = state.round_state().await?;
    let Some(round_id) = round.active_round_id.clone() else {
        return Err(ServiceError::InvalidState("no round is in flight".into()));
    };

    match round.phase {
        Phase::Live => live_buzz(state, &player, &round, &round_id).await,
        Phase::Countdown | Phase::Suspense if round.one_push_rule => {
            too_soon_buzz(state, &player, &round_id).await
        }
        Phase::Countdown | Phase::Suspense => {
            Err(ServiceError::InvalidState("wait for GO".into()))
        }
        Phase::Register | Phase::Locked | Phase::Finished => Err(ServiceError::InvalidState(
            "the round is not accepting buzzes".into(),
        )),
    }
}

async fn live_buzz(
    state: &SharedState,
    player: &PlayerRecord,
    round: &RoundState,
    round_id: &str,
) -> Result<BuzzResponse, ServiceError> {
    let now = state.clock().now_ms();
    let attempt = Attempt::live(player, now);

    let attempt_key = keys::attempt(state.game_id(), round_id, player.id);
    let written = create_if_absent(
        state.store(),
        &attempt_key,
        serde_json::to_value(&attempt).map_err(StoreError::from)?,
    )
    .await?;
    if !written.created() {
        return Ok(BuzzResponse::duplicate());
    }

    // Local estimate only; the authoritative reaction time is recomputed from
    // the stored attempt during finalization.
    let estimate = now.saturating_sub(round.live_at.unwrap_or(now));

    let winner = WinnerRecord::from_attempt(&attempt, now);
    let winner_key = keys::winner(state.game_id(), round_id);
    let arbitrated = create_if_absent(
        state.store(),
        &winner_key,
        serde_json::to_value(&winner).map_err(StoreError::from)?,
    )
    .await?;

    if arbitrated.created() {
        Ok(BuzzResponse::winner(estimate))
    } else {
        Ok(BuzzResponse::recorded(estimate))
    }
}

async fn too_soon_buzz(
    state: &SharedState,
    player: &PlayerRecord,
    round_id: &str,
) -> Result<BuzzResponse, ServiceError> {
    let attempt = Attempt::too_soon(player);
    let attempt_key = keys::attempt(state.game_id(), round_id, player.id);
    let written = create_if_absent(
        state.store(),
        &attempt_key,
        serde_json::to_value(&attempt).map_err(StoreError::from)?,
    )
    .await?;

    if written.created() {
        Ok(BuzzResponse::too_soon())
    } else {
        Ok(BuzzResponse::duplicate())
    }
}

async fn load_player(state: &SharedState, player_id: Uuid) -> Result<PlayerRecord, ServiceError> {
    let key = keys::player(state.game_id(), player_id);
    let value = state.store().get(&key).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("player `{player_id}` is not registered"))
    })?;
    decode(&key, value).ok_or_else(|| {
        ServiceError::NotFound(format!("player `{player_id}` has a malformed record"))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dto::player::BuzzStatus,
        state::{AppState, clock::ManualClock},
        store::{RoundStore, memory::MemoryStore},
    };

    async fn seeded(phase: Phase, one_push_rule: bool) -> (SharedState, Uuid, Uuid) {
        let state = AppState::new(
            AppConfig::default(),
            Uuid::new_v4(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::at(10_350)),
        );
        let game = state.game_id();

        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        for (id, nickname) in [(p1, "p1"), (p2, "p2")] {
            let record = PlayerRecord {
                id,
                nickname: nickname.into(),
                first_name: String::new(),
                last_name: String::new(),
                victory_chant: None,
                score: 0,
                last_reaction_ms: None,
                eliminated: None,
                registered_at: 1,
            };
            state
                .store()
                .set(
                    &keys::player(game, id),
                    serde_json::to_value(&record).unwrap(),
                )
                .await
                .unwrap();
        }

        let round = RoundState {
            phase,
            active_round_id: Some("r1".into()),
            live_at: Some(10_000),
            close_at: Some(15_000),
            one_push_rule,
            round_number: 1,
            ..RoundState::default()
        };
        state
            .store()
            .set(
                &keys::round_state(game),
                serde_json::to_value(&round).unwrap(),
            )
            .await
            .unwrap();

        (state, p1, p2)
    }

    #[tokio::test]
    async fn first_live_buzz_wins_later_ones_are_recorded() {
        let (state, p1, p2) = seeded(Phase::Live, false).await;

        let first = buzz(&state, p1).await.unwrap();
        assert_eq!(first.status, BuzzStatus::Winner);
        assert_eq!(first.reaction_estimate_ms, Some(350));

        let second = buzz(&state, p2).await.unwrap();
        assert_eq!(second.status, BuzzStatus::Recorded);

        // Exactly one winner record, naming the first arrival.
        let winner = state
            .store()
            .get(&keys::winner(state.game_id(), "r1"))
            .await
            .unwrap()
            .unwrap();
        let winner: WinnerRecord = serde_json::from_value(winner).unwrap();
        assert_eq!(winner.player_id, p1);
    }

    #[tokio::test]
    async fn replayed_buzz_is_a_no_op() {
        let (state, p1, _p2) = seeded(Phase::Live, false).await;

        buzz(&state, p1).await.unwrap();
        let replay = buzz(&state, p1).await.unwrap();
        assert_eq!(replay.status, BuzzStatus::Duplicate);

        let attempts = state
            .store()
            .list_prefix(&keys::attempts_prefix(state.game_id(), "r1"))
            .await
            .unwrap();
        assert_eq!(attempts.len(), 1);
    }

    #[tokio::test]
    async fn early_buzz_under_one_push_rule_records_too_soon() {
        let (state, p1, _p2) = seeded(Phase::Suspense, true).await;

        let response = buzz(&state, p1).await.unwrap();
        assert_eq!(response.status, BuzzStatus::TooSoon);

        let attempt = state
            .store()
            .get(&keys::attempt(state.game_id(), "r1", p1))
            .await
            .unwrap()
            .unwrap();
        let attempt: Attempt = serde_json::from_value(attempt).unwrap();
        assert!(attempt.too_soon);
        assert!(attempt.buzz_at.is_none());

        // No winner record is ever produced by a too-soon attempt.
        let winner = state
            .store()
            .get(&keys::winner(state.game_id(), "r1"))
            .await
            .unwrap();
        assert!(winner.is_none());
    }

    #[tokio::test]
    async fn early_buzz_without_one_push_rule_writes_nothing() {
        let (state, p1, _p2) = seeded(Phase::Countdown, false).await;

        let err = buzz(&state, p1).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let attempts = state
            .store()
            .list_prefix(&keys::attempts_prefix(state.game_id(), "r1"))
            .await
            .unwrap();
        assert!(attempts.is_empty());
    }

    #[tokio::test]
    async fn eliminated_players_cannot_buzz() {
        let (state, p1, _p2) = seeded(Phase::Live, false).await;
        state
            .store()
            .update(
                &keys::player(state.game_id(), p1),
                serde_json::json!({"eliminated": {
                    "round_id": "r0", "round_number": 1, "at": 5, "kind": "slowest"
                }}),
            )
            .await
            .unwrap();

        let err = buzz(&state, p1).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn unregistered_players_are_rejected() {
        let (state, _p1, _p2) = seeded(Phase::Live, false).await;
        let err = buzz(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}

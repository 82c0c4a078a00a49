//! Round lifecycle operations driven by the operator.

use rand::Rng;
use serde_json::json;

use crate::{
    dto::admin::{ActionResponse, FinalWinnerResponse, StartRoundRequest, StartRoundResponse},
    error::ServiceError,
    services::{countdown, countdown::RoundSchedule, leaderboard, player_service, scoring, sse_events},
    state::{
        SharedState,
        round::{Phase, RoundState},
    },
    store::{StoreError, keys},
};

/// Schedule and launch a new fastest-finger round.
///
/// Rejected while a round is in flight (countdown or live). Bumping the round
/// epoch before anything is spawned invalidates the previous round's
/// countdown loop and winner watcher.
pub async fn start_round(
    state: &SharedState,
    request: StartRoundRequest,
) -> Result<StartRoundResponse, ServiceError> {
    let current = state.round_state().await?;
    current.ensure_can_start()?;

    let now = state.clock().now_ms();
    let countdown_ms = request
        .countdown_ms
        .unwrap_or(state.config().default_countdown_ms);
    let window_ms = request.window_ms.unwrap_or(state.config().default_window_ms);
    let suspense_ms = rand::rng().random_range(state.config().suspense_range());
    let schedule = RoundSchedule::generate(
        now,
        countdown_ms,
        window_ms,
        suspense_ms,
        current.round_number + 1,
    );

    let epoch = state.bump_round_epoch();

    let round = RoundState {
        phase: Phase::Countdown,
        active_round_id: Some(schedule.round_id.clone()),
        suspense_at: Some(schedule.suspense_at),
        live_at: Some(schedule.live_at),
        close_at: Some(schedule.close_at),
        suspense_ms: Some(schedule.suspense_ms),
        countdown_value: None,
        one_push_rule: request.one_push_rule,
        elimination_mode: request.elimination_mode,
        end_scene_style: request.end_scene_style,
        round_number: schedule.round_number,
        updated_at: now,
    };
    state
        .store()
        .set(
            &keys::round_state(state.game_id()),
            serde_json::to_value(&round).map_err(StoreError::from)?,
        )
        .await?;
    sse_events::broadcast_phase_changed(state, &round);

    let watcher = tokio::spawn(scoring::watch_winner(
        state.clone(),
        epoch,
        schedule.round_id.clone(),
    ));
    state.attach_winner_watch(Some(watcher)).await;
    tokio::spawn(countdown::run_countdown(state.clone(), epoch, schedule.clone()));

    Ok(StartRoundResponse {
        ticks: schedule.ticks(),
        round_id: schedule.round_id,
        round_number: schedule.round_number,
        suspense_at: schedule.suspense_at,
        live_at: schedule.live_at,
        close_at: schedule.close_at,
    })
}

/// Abandon the current round and return to the register phase.
///
/// Scheduling fields are cleared; attempt and winner documents of the
/// abandoned round are simply orphaned under their round-scoped keys.
pub async fn reset_round(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    state.bump_round_epoch();
    state.attach_winner_watch(None).await;

    let current = state.round_state().await?;
    let round = RoundState {
        phase: Phase::Register,
        round_number: current.round_number,
        updated_at: state.clock().now_ms(),
        ..RoundState::default()
    };
    state
        .store()
        .set(
            &keys::round_state(state.game_id()),
            serde_json::to_value(&round).map_err(StoreError::from)?,
        )
        .await?;
    sse_events::broadcast_phase_changed(state, &round);

    Ok(ActionResponse::new("round reset; back to registration"))
}

/// Declare the last surviving player the champion of the session.
///
/// Manual by design: requires a locked elimination-mode round and exactly one
/// player without an elimination mark. Moves the session into the terminal
/// finished phase.
pub async fn declare_final_winner(
    state: &SharedState,
) -> Result<FinalWinnerResponse, ServiceError> {
    let round = state.round_state().await?;
    if round.phase != Phase::Locked {
        return Err(ServiceError::InvalidState(
            "a champion can only be declared from a locked round".into(),
        ));
    }
    if !round.elimination_mode {
        return Err(ServiceError::InvalidState(
            "the last round was not an elimination round".into(),
        ));
    }

    let mut survivors: Vec<_> = player_service::load_players(state)
        .await?
        .into_iter()
        .filter(|player| player.eliminated.is_none())
        .collect();
    let champion = match survivors.len() {
        1 => survivors.remove(0),
        found => {
            return Err(ServiceError::InvalidState(format!(
                "expected exactly one surviving player, found {found}"
            )));
        }
    };

    let now = state.clock().now_ms();
    state
        .store()
        .update(
            &keys::round_state(state.game_id()),
            json!({"phase": Phase::Finished, "updated_at": now}),
        )
        .await?;
    let finished = state.round_state().await?;
    sse_events::broadcast_phase_changed(state, &finished);

    Ok(FinalWinnerResponse {
        champion: champion.into(),
    })
}

/// Reset every score and elimination mark and return to registration.
pub async fn refresh_game(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    state.bump_round_epoch();
    state.attach_winner_watch(None).await;
    state.clear_round_marks();

    let prefix = keys::players_prefix(state.game_id());
    for (key, _) in state.store().list_prefix(&prefix).await? {
        state
            .store()
            .update(
                &key,
                json!({"score": 0, "last_reaction_ms": null, "eliminated": null}),
            )
            .await?;
    }

    let round = RoundState {
        updated_at: state.clock().now_ms(),
        ..RoundState::default()
    };
    state
        .store()
        .set(
            &keys::round_state(state.game_id()),
            serde_json::to_value(&round).map_err(StoreError::from)?,
        )
        .await?;
    sse_events::broadcast_phase_changed(state, &round);

    let standings = leaderboard::standings(state).await?;
    sse_events::broadcast_leaderboard(state, standings.rows);

    Ok(ActionResponse::new(
        "scores and eliminations cleared; back to registration",
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, clock::ManualClock, models::PlayerRecord},
        store::{RoundStore, memory::MemoryStore},
    };

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            Uuid::new_v4(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::at(50_000)),
        )
    }

    fn start_request() -> StartRoundRequest {
        StartRoundRequest {
            countdown_ms: Some(3_000),
            window_ms: Some(5_000),
            one_push_rule: true,
            elimination_mode: false,
            end_scene_style: Default::default(),
        }
    }

    async fn seed_player(state: &SharedState, eliminated: bool) -> Uuid {
        let id = Uuid::new_v4();
        let record = PlayerRecord {
            id,
            nickname: "p".into(),
            first_name: String::new(),
            last_name: String::new(),
            victory_chant: None,
            score: 2,
            last_reaction_ms: Some(300),
            eliminated: None,
            registered_at: 1,
        };
        state
            .store()
            .set(
                &keys::player(state.game_id(), id),
                serde_json::to_value(&record).unwrap(),
            )
            .await
            .unwrap();
        if eliminated {
            state
                .store()
                .update(
                    &keys::player(state.game_id(), id),
                    json!({"eliminated": {
                        "round_id": "r0", "round_number": 1, "at": 5, "kind": "too_soon"
                    }}),
                )
                .await
                .unwrap();
        }
        id
    }

    #[tokio::test]
    async fn starting_schedules_countdown_and_bumps_epoch() {
        let state = test_state();
        let epoch_before = state.round_epoch();

        let response = start_round(&state, start_request()).await.unwrap();
        assert_eq!(response.round_number, 1);
        assert_eq!(response.ticks, 3);
        assert!(response.live_at < response.close_at);
        assert!(state.round_epoch() > epoch_before);

        let round = state.round_state().await.unwrap();
        assert_eq!(round.phase, Phase::Countdown);
        assert_eq!(round.active_round_id, Some(response.round_id));
        let pause = round.suspense_ms.unwrap();
        assert!(state.config().suspense_range().contains(&pause));
    }

    #[tokio::test]
    async fn starting_mid_flight_changes_nothing() {
        let state = test_state();
        let first = start_round(&state, start_request()).await.unwrap();

        let err = start_round(&state, start_request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let round = state.round_state().await.unwrap();
        assert_eq!(round.active_round_id, Some(first.round_id));
        assert_eq!(round.live_at, Some(first.live_at));
        assert_eq!(round.round_number, 1);
    }

    #[tokio::test]
    async fn reset_clears_schedule_but_keeps_round_counter() {
        let state = test_state();
        start_round(&state, start_request()).await.unwrap();

        reset_round(&state).await.unwrap();

        let round = state.round_state().await.unwrap();
        assert_eq!(round.phase, Phase::Register);
        assert_eq!(round.round_number, 1);
        assert!(round.active_round_id.is_none());
        assert!(round.live_at.is_none());
    }

    #[tokio::test]
    async fn champion_needs_a_single_survivor() {
        let state = test_state();
        let survivor = seed_player(&state, false).await;
        seed_player(&state, true).await;

        let locked = RoundState {
            phase: Phase::Locked,
            active_round_id: Some("r1".into()),
            elimination_mode: true,
            round_number: 1,
            ..RoundState::default()
        };
        state
            .store()
            .set(
                &keys::round_state(state.game_id()),
                serde_json::to_value(&locked).unwrap(),
            )
            .await
            .unwrap();

        let response = declare_final_winner(&state).await.unwrap();
        assert_eq!(response.champion.id, survivor);
        assert_eq!(state.round_state().await.unwrap().phase, Phase::Finished);
    }

    #[tokio::test]
    async fn champion_is_rejected_with_multiple_survivors() {
        let state = test_state();
        seed_player(&state, false).await;
        seed_player(&state, false).await;

        let locked = RoundState {
            phase: Phase::Locked,
            active_round_id: Some("r1".into()),
            elimination_mode: true,
            round_number: 1,
            ..RoundState::default()
        };
        state
            .store()
            .set(
                &keys::round_state(state.game_id()),
                serde_json::to_value(&locked).unwrap(),
            )
            .await
            .unwrap();

        let err = declare_final_winner(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn two_player_round_runs_to_a_decided_summary() {
        use crate::{
            dto::player::BuzzStatus,
            services::{buzz_service, phase_guard},
            state::models::RoundSummary,
        };

        let clock = Arc::new(ManualClock::at(50_000));
        let state = AppState::new(
            AppConfig::default(),
            Uuid::new_v4(),
            Arc::new(MemoryStore::new()),
            clock.clone(),
        );
        let p1 = seed_player(&state, false).await;
        let p2 = seed_player(&state, false).await;

        let response = start_round(&state, start_request()).await.unwrap();

        // Let the guard catch up to the armed reaction window.
        clock.set(response.live_at);
        phase_guard::reconcile(&state).await.unwrap();
        phase_guard::reconcile(&state).await.unwrap();
        assert_eq!(state.round_state().await.unwrap().phase, Phase::Live);

        clock.set(response.live_at + 120);
        let first = buzz_service::buzz(&state, p1).await.unwrap();
        assert_eq!(first.status, BuzzStatus::Winner);

        clock.set(response.live_at + 480);
        let second = buzz_service::buzz(&state, p2).await.unwrap();
        assert_eq!(second.status, BuzzStatus::Recorded);

        // The winner watcher settles the round; the guard pass at close is a
        // no-op thanks to the per-round decided mark.
        clock.set(response.close_at);
        phase_guard::reconcile(&state).await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(state.round_state().await.unwrap().phase, Phase::Locked);

        let summary = state
            .store()
            .get(&keys::round_summary(state.game_id(), &response.round_id))
            .await
            .unwrap()
            .unwrap();
        let summary: RoundSummary = serde_json::from_value(summary).unwrap();
        assert_eq!(summary.winner_id, Some(p1));
        let order: Vec<Uuid> = summary.attempts.iter().map(|a| a.player_id).collect();
        assert_eq!(order, vec![p1, p2]);
        assert_eq!(summary.attempts[0].reaction_ms, Some(120));
        assert_eq!(summary.attempts[1].reaction_ms, Some(480));
    }

    #[tokio::test]
    async fn refresh_zeroes_scores_and_eliminations() {
        let state = test_state();
        let id = seed_player(&state, true).await;

        refresh_game(&state).await.unwrap();

        let value = state
            .store()
            .get(&keys::player(state.game_id(), id))
            .await
            .unwrap()
            .unwrap();
        let record: PlayerRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.score, 0);
        assert!(record.last_reaction_ms.is_none());
        assert!(record.eliminated.is_none());

        let round = state.round_state().await.unwrap();
        assert_eq!(round.phase, Phase::Register);
        assert_eq!(round.round_number, 0);
    }
}

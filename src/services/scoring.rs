//! Winner finalization, scoring, and elimination resolution.
//!
//! Finalization is triggered from two sides: the winner watcher fires as soon
//! as a `WinnerRecord` appears, and the phase guard fires when the reaction
//! window closes without one. The per-round decided mark makes the two paths
//! converge on exactly one settlement.

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    services::{leaderboard, sse_events},
    state::{
        SharedState,
        models::{
            Attempt, AttemptOutcome, Elimination, EliminationKind, PlayerRecord, RoundSummary,
            WinnerRecord, decode,
        },
        round::Phase,
    },
    store::{StoreError, keys},
};

/// Project raw attempts into display-ordered outcome rows.
///
/// Too-soon attempts come first (shown but never eligible to win), then valid
/// attempts from fastest to slowest.
pub fn rank_attempts(
    attempts: &[Attempt],
    live_at: u64,
    winner_id: Option<Uuid>,
) -> Vec<AttemptOutcome> {
    let mut outcomes: Vec<AttemptOutcome> = attempts
        .iter()
        .map(|attempt| AttemptOutcome {
            player_id: attempt.player_id,
            nickname: attempt.nickname.clone(),
            reaction_ms: attempt.reaction_ms(live_at),
            too_soon: attempt.too_soon,
            winner: !attempt.too_soon && winner_id.is_some_and(|id| id == attempt.player_id),
        })
        .collect();
    outcomes.sort_by_key(|outcome| {
        if outcome.too_soon {
            (0u8, 0u64)
        } else {
            (1, outcome.reaction_ms.unwrap_or(u64::MAX))
        }
    });
    outcomes
}

/// Players an elimination-mode round sends out, with the reason.
///
/// Every too-soon attempt is eliminated, plus the single slowest valid
/// respondent (ties broken by the first one encountered). Players who never
/// attempted are untouched by this rule.
pub fn resolve_eliminations(outcomes: &[AttemptOutcome]) -> Vec<(Uuid, EliminationKind)> {
    let mut victims: Vec<(Uuid, EliminationKind)> = outcomes
        .iter()
        .filter(|outcome| outcome.too_soon)
        .map(|outcome| (outcome.player_id, EliminationKind::TooSoon))
        .collect();

    let mut slowest: Option<(Uuid, u64)> = None;
    for outcome in outcomes {
        if outcome.too_soon {
            continue;
        }
        let Some(reaction) = outcome.reaction_ms else {
            continue;
        };
        match slowest {
            Some((_, best)) if reaction <= best => {}
            _ => slowest = Some((outcome.player_id, reaction)),
        }
    }
    if let Some((player_id, _)) = slowest {
        victims.push((player_id, EliminationKind::Slowest));
    }

    victims
}

/// Watch the winner key of a round and finalize on the first record.
///
/// The task captures the round epoch it was spawned with and exits silently
/// once superseded; finalization failures are surfaced to the operator and
/// left for the next notification or a manual retry.
pub async fn watch_winner(state: SharedState, epoch: u64, round_id: String) {
    let key = keys::winner(state.game_id(), &round_id);
    let mut receiver = match state.store().subscribe(&key).await {
        Ok(receiver) => receiver,
        Err(err) => {
            warn!(error = %err, round = %round_id, "failed to subscribe to winner record");
            return;
        }
    };

    loop {
        if receiver.borrow_and_update().is_some() {
            if state.round_epoch() != epoch {
                return;
            }
            if let Err(err) = finalize_round(&state, &round_id).await {
                warn!(error = %err, round = %round_id, "winner finalization failed");
                sse_events::broadcast_admin_status(
                    &state,
                    format!("finalizing round failed: {err}"),
                );
            }
            return;
        }
        if receiver.changed().await.is_err() {
            return;
        }
        if state.round_epoch() != epoch {
            return;
        }
    }
}

/// Settle a round exactly once: summary, scores, lock, eliminations.
///
/// Duplicate invocations are no-ops; a failed settlement releases its claim
/// so a later trigger can retry.
pub async fn finalize_round(state: &SharedState, round_id: &str) -> Result<(), ServiceError> {
    if !state.mark_round_decided(round_id) {
        return Ok(());
    }
    if let Err(err) = decide_round(state, round_id).await {
        state.unmark_round_decided(round_id);
        return Err(err);
    }
    Ok(())
}

async fn decide_round(state: &SharedState, round_id: &str) -> Result<(), ServiceError> {
    let game = state.game_id();
    let round = state.round_state().await?;
    let now = state.clock().now_ms();
    let live_at = round.live_at.unwrap_or(now);

    let winner_key = keys::winner(game, round_id);
    let winner: Option<WinnerRecord> = match state.store().get(&winner_key).await? {
        Some(value) => decode(&winner_key, value),
        None => None,
    };

    let attempts = load_attempts(state, round_id).await?;
    let outcomes = rank_attempts(&attempts, live_at, winner.as_ref().map(|w| w.player_id));
    let winner_reaction = winner
        .as_ref()
        .map(|record| record.buzz_at.saturating_sub(live_at));

    let summary = RoundSummary {
        round_id: round_id.to_owned(),
        round_number: round.round_number,
        winner_id: winner.as_ref().map(|record| record.player_id),
        victory_chant: winner.as_ref().and_then(|record| record.victory_chant.clone()),
        winner_reaction_ms: winner_reaction,
        attempts: outcomes.clone(),
        decided_at: now,
    };
    state
        .store()
        .set(
            &keys::round_summary(game, round_id),
            serde_json::to_value(&summary).map_err(StoreError::from)?,
        )
        .await?;

    if let Some(record) = &winner {
        credit_winner(state, record, winner_reaction, now).await?;
    }
    for outcome in &outcomes {
        if outcome.winner {
            continue;
        }
        if let Some(reaction) = outcome.reaction_ms {
            record_reaction(state, outcome.player_id, reaction).await?;
        }
    }

    if round.active_round_id.as_deref() == Some(round_id)
        && !matches!(round.phase, Phase::Locked | Phase::Finished)
    {
        state
            .store()
            .update(
                &keys::round_state(game),
                json!({"phase": Phase::Locked, "updated_at": now}),
            )
            .await?;
        let locked = state.round_state().await?;
        sse_events::broadcast_phase_changed(state, &locked);
    }

    if let (Some(record), Some(reaction)) = (&winner, winner_reaction) {
        sse_events::broadcast_winner(state, record, reaction, round.round_number);
    }
    sse_events::broadcast_round_result(state, summary.into());

    if round.elimination_mode {
        apply_eliminations(state, round_id, round.round_number, &outcomes).await?;
    }

    let standings = leaderboard::standings(state).await?;
    sse_events::broadcast_leaderboard(state, standings.rows);

    Ok(())
}

/// Record the eliminations of one round exactly once.
///
/// Elimination marks are monotonic: a player already carrying one keeps it,
/// whatever this round produced.
pub async fn apply_eliminations(
    state: &SharedState,
    round_id: &str,
    round_number: u32,
    outcomes: &[AttemptOutcome],
) -> Result<(), ServiceError> {
    if !state.mark_round_resolved(round_id) {
        return Ok(());
    }

    let now = state.clock().now_ms();
    let mut eliminated = Vec::new();
    for (player_id, kind) in resolve_eliminations(outcomes) {
        let key = keys::player(state.game_id(), player_id);
        let Some(value) = state.store().get(&key).await? else {
            continue;
        };
        let Some(record) = decode::<PlayerRecord>(&key, value) else {
            continue;
        };
        if record.eliminated.is_some() {
            continue;
        }

        let mark = Elimination {
            round_id: round_id.to_owned(),
            round_number,
            at: now,
            kind,
        };
        state
            .store()
            .update(
                &key,
                json!({"eliminated": serde_json::to_value(&mark).map_err(StoreError::from)?}),
            )
            .await?;
        eliminated.push(player_id);
    }

    if !eliminated.is_empty() {
        sse_events::broadcast_players_eliminated(state, eliminated, round_number);
    }
    Ok(())
}

async fn load_attempts(state: &SharedState, round_id: &str) -> Result<Vec<Attempt>, ServiceError> {
    let prefix = keys::attempts_prefix(state.game_id(), round_id);
    Ok(state
        .store()
        .list_prefix(&prefix)
        .await?
        .into_iter()
        .filter_map(|(key, value)| decode(&key, value))
        .collect())
}

async fn credit_winner(
    state: &SharedState,
    winner: &WinnerRecord,
    reaction_ms: Option<u64>,
    now: u64,
) -> Result<(), ServiceError> {
    let key = keys::player(state.game_id(), winner.player_id);
    let recovery = winner.clone();
    state
        .store()
        .transact(
            &key,
            Box::new(move |current| {
                // A missing or corrupt record is recreated defensively so the
                // win is never lost to a mid-round boot.
                let mut record = current
                    .and_then(|value| serde_json::from_value::<PlayerRecord>(value).ok())
                    .unwrap_or_else(|| PlayerRecord::recovered(&recovery, now));
                record.score += 1;
                record.last_reaction_ms = reaction_ms.or(record.last_reaction_ms);
                serde_json::to_value(&record).map_err(StoreError::from)
            }),
        )
        .await?;
    Ok(())
}

async fn record_reaction(
    state: &SharedState,
    player_id: Uuid,
    reaction_ms: u64,
) -> Result<(), ServiceError> {
    let key = keys::player(state.game_id(), player_id);
    if state.store().get(&key).await?.is_some() {
        state
            .store()
            .update(&key, json!({"last_reaction_ms": reaction_ms}))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, clock::ManualClock, round::RoundState},
        store::RoundStore,
        store::memory::MemoryStore,
    };

    fn attempt(player_id: Uuid, nickname: &str, buzz_at: Option<u64>) -> Attempt {
        Attempt {
            player_id,
            nickname: nickname.into(),
            buzz_at,
            too_soon: buzz_at.is_none(),
            victory_chant: None,
        }
    }

    fn player(id: Uuid, nickname: &str) -> PlayerRecord {
        PlayerRecord {
            id,
            nickname: nickname.into(),
            first_name: String::new(),
            last_name: String::new(),
            victory_chant: Some("yes!".into()),
            score: 0,
            last_reaction_ms: None,
            eliminated: None,
            registered_at: 1,
        }
    }

    #[test]
    fn outcomes_order_too_soon_first_then_fastest() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let attempts = vec![
            attempt(a, "a", Some(1_500)),
            attempt(b, "b", None),
            attempt(c, "c", Some(1_100)),
        ];

        let outcomes = rank_attempts(&attempts, 1_000, Some(c));
        let order: Vec<Uuid> = outcomes.iter().map(|o| o.player_id).collect();
        assert_eq!(order, vec![b, c, a]);
        assert!(outcomes[0].too_soon);
        assert!(outcomes[1].winner);
        assert_eq!(outcomes[1].reaction_ms, Some(100));
        assert_eq!(outcomes[2].reaction_ms, Some(500));
    }

    #[test]
    fn eliminations_take_too_soon_and_single_slowest() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let attempts = vec![
            attempt(a, "a", Some(1_100)),
            attempt(b, "b", None),
            attempt(c, "c", Some(1_500)),
        ];
        let outcomes = rank_attempts(&attempts, 1_000, Some(a));

        let victims = resolve_eliminations(&outcomes);
        assert_eq!(
            victims,
            vec![
                (b, EliminationKind::TooSoon),
                (c, EliminationKind::Slowest)
            ]
        );
    }

    #[test]
    fn players_who_never_attempted_are_not_eliminated() {
        assert!(resolve_eliminations(&[]).is_empty());
    }

    async fn seeded_state(elimination_mode: bool) -> (SharedState, Uuid, Uuid) {
        let state = AppState::new(
            AppConfig::default(),
            Uuid::new_v4(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::at(20_000)),
        );
        let game = state.game_id();
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());

        for (id, nickname) in [(p1, "p1"), (p2, "p2")] {
            state
                .store()
                .set(
                    &keys::player(game, id),
                    serde_json::to_value(player(id, nickname)).unwrap(),
                )
                .await
                .unwrap();
        }

        let round = RoundState {
            phase: Phase::Live,
            active_round_id: Some("r1".into()),
            live_at: Some(10_000),
            close_at: Some(15_000),
            elimination_mode,
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

        for (id, nickname, buzz_at) in [(p1, "p1", 10_200), (p2, "p2", 10_900)] {
            state
                .store()
                .set(
                    &keys::attempt(game, "r1", id),
                    serde_json::to_value(attempt(id, nickname, Some(buzz_at))).unwrap(),
                )
                .await
                .unwrap();
        }
        let winner = WinnerRecord {
            player_id: p1,
            nickname: "p1".into(),
            buzz_at: 10_200,
            victory_chant: None,
        };
        state
            .store()
            .set(
                &keys::winner(game, "r1"),
                serde_json::to_value(&winner).unwrap(),
            )
            .await
            .unwrap();

        (state, p1, p2)
    }

    async fn load_player(state: &SharedState, id: Uuid) -> PlayerRecord {
        let key = keys::player(state.game_id(), id);
        let value = state.store().get(&key).await.unwrap().unwrap();
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn finalize_credits_winner_and_locks_round() {
        let (state, p1, p2) = seeded_state(false).await;

        finalize_round(&state, "r1").await.unwrap();

        let winner = load_player(&state, p1).await;
        assert_eq!(winner.score, 1);
        assert_eq!(winner.last_reaction_ms, Some(200));
        let loser = load_player(&state, p2).await;
        assert_eq!(loser.score, 0);
        assert_eq!(loser.last_reaction_ms, Some(900));

        assert_eq!(state.round_state().await.unwrap().phase, Phase::Locked);

        let summary = state
            .store()
            .get(&keys::round_summary(state.game_id(), "r1"))
            .await
            .unwrap()
            .unwrap();
        let summary: RoundSummary = serde_json::from_value(summary).unwrap();
        assert_eq!(summary.winner_id, Some(p1));
        assert_eq!(summary.winner_reaction_ms, Some(200));
        assert_eq!(summary.attempts.len(), 2);
        assert!(summary.attempts[0].winner);
    }

    #[tokio::test]
    async fn finalize_is_idempotent_per_round() {
        let (state, p1, _p2) = seeded_state(false).await;

        finalize_round(&state, "r1").await.unwrap();
        finalize_round(&state, "r1").await.unwrap();

        assert_eq!(load_player(&state, p1).await.score, 1);
    }

    #[tokio::test]
    async fn elimination_mode_marks_slowest_respondent() {
        let (state, p1, p2) = seeded_state(true).await;

        finalize_round(&state, "r1").await.unwrap();

        assert!(load_player(&state, p1).await.eliminated.is_none());
        let eliminated = load_player(&state, p2).await.eliminated.unwrap();
        assert_eq!(eliminated.kind, EliminationKind::Slowest);
        assert_eq!(eliminated.round_number, 1);
    }

    #[tokio::test]
    async fn existing_elimination_marks_are_kept() {
        let (state, _p1, p2) = seeded_state(true).await;
        let earlier = Elimination {
            round_id: "r0".into(),
            round_number: 0,
            at: 5,
            kind: EliminationKind::TooSoon,
        };
        state
            .store()
            .update(
                &keys::player(state.game_id(), p2),
                json!({"eliminated": serde_json::to_value(&earlier).unwrap()}),
            )
            .await
            .unwrap();

        finalize_round(&state, "r1").await.unwrap();

        assert_eq!(load_player(&state, p2).await.eliminated, Some(earlier));
    }

    #[tokio::test]
    async fn missing_winner_record_is_recreated_defensively() {
        let (state, p1, _p2) = seeded_state(false).await;
        state
            .store()
            .remove(&keys::player(state.game_id(), p1))
            .await
            .unwrap();

        finalize_round(&state, "r1").await.unwrap();

        let recovered = load_player(&state, p1).await;
        assert_eq!(recovered.score, 1);
        assert_eq!(recovered.nickname, "p1");
    }
}

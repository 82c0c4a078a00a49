//! Builders and broadcast helpers for the SSE event vocabulary.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        public::{LeaderboardRow, PlayerSummary, RoundResultResponse, RoundSnapshot},
        sse::{
            CountdownTickEvent, LeaderboardEvent, PhaseChangedEvent, PlayerBootedEvent,
            PlayerJoinedEvent, PlayersEliminatedEvent, RoundResultEvent, ServerEvent, StatusEvent,
            WinnerEvent,
        },
    },
    state::{SharedState, models::WinnerRecord, round::RoundState},
};

const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_COUNTDOWN_TICK: &str = "countdown_tick";
const EVENT_WINNER: &str = "round.winner";
const EVENT_ROUND_RESULT: &str = "round.result";
const EVENT_LEADERBOARD: &str = "leaderboard";
const EVENT_PLAYER_JOINED: &str = "player.joined";
const EVENT_PLAYER_BOOTED: &str = "player.booted";
const EVENT_PLAYERS_ELIMINATED: &str = "players.eliminated";
const EVENT_STATUS: &str = "status";

/// Broadcast the current round snapshot after a phase change.
pub fn broadcast_phase_changed(state: &SharedState, round: &RoundState) {
    let payload = PhaseChangedEvent(RoundSnapshot::new(state.game_id(), round));
    send_public_event(state, EVENT_PHASE_CHANGED, &payload);
    send_admin_event(state, EVENT_PHASE_CHANGED, &payload);
}

/// Broadcast a countdown tick; `None` clears the display.
pub fn broadcast_countdown_tick(state: &SharedState, value: Option<u32>) {
    let payload = CountdownTickEvent { value };
    send_public_event(state, EVENT_COUNTDOWN_TICK, &payload);
}

/// Broadcast the arbitrated winner of the round.
pub fn broadcast_winner(
    state: &SharedState,
    record: &WinnerRecord,
    reaction_ms: u64,
    round_number: u32,
) {
    let payload = WinnerEvent::new(record, reaction_ms, round_number);
    send_public_event(state, EVENT_WINNER, &payload);
    send_admin_event(state, EVENT_WINNER, &payload);
}

/// Broadcast the full sorted result rows of a decided round.
pub fn broadcast_round_result(state: &SharedState, result: RoundResultResponse) {
    let payload = RoundResultEvent(result);
    send_public_event(state, EVENT_ROUND_RESULT, &payload);
    send_admin_event(state, EVENT_ROUND_RESULT, &payload);
}

/// Broadcast refreshed standings.
pub fn broadcast_leaderboard(state: &SharedState, rows: Vec<LeaderboardRow>) {
    let payload = LeaderboardEvent { rows };
    send_public_event(state, EVENT_LEADERBOARD, &payload);
}

/// Broadcast a newly registered player.
pub fn broadcast_player_joined(state: &SharedState, player: PlayerSummary) {
    let payload = PlayerJoinedEvent { player };
    send_public_event(state, EVENT_PLAYER_JOINED, &payload);
    send_admin_event(state, EVENT_PLAYER_JOINED, &payload);
}

/// Broadcast the removal of a player.
pub fn broadcast_player_booted(state: &SharedState, player_id: Uuid) {
    let payload = PlayerBootedEvent { player_id };
    send_public_event(state, EVENT_PLAYER_BOOTED, &payload);
    send_admin_event(state, EVENT_PLAYER_BOOTED, &payload);
}

/// Broadcast the players eliminated by an elimination-mode round.
pub fn broadcast_players_eliminated(state: &SharedState, player_ids: Vec<Uuid>, round_number: u32) {
    let payload = PlayersEliminatedEvent {
        player_ids,
        round_number,
    };
    send_public_event(state, EVENT_PLAYERS_ELIMINATED, &payload);
    send_admin_event(state, EVENT_PLAYERS_ELIMINATED, &payload);
}

/// Send a human-readable status line to the operator console only.
pub fn broadcast_admin_status(state: &SharedState, message: impl Into<String>) {
    let payload = StatusEvent {
        message: message.into(),
    };
    send_admin_event(state, EVENT_STATUS, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

fn send_admin_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.admin_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize admin SSE payload"),
    }
}

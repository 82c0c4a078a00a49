//! Event payloads carried on the SSE render streams.

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::public::{LeaderboardRow, PlayerSummary, RoundResultResponse, RoundSnapshot},
    state::models::WinnerRecord,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized data field.
    pub data: String,
}

impl ServerEvent {
    /// Wrap an already-serialized payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Initial metadata sent to an SSE client when it connects.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `admin`).
    pub stream: String,
    /// Game session hosted by this server; players register against it.
    pub game_id: Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
}

/// Token handshake sent to the single operator stream.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminHandshake {
    /// Token the operator must echo in `x-admin-token`.
    pub token: String,
}

/// Operator-facing status line (precondition rejections, store failures).
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusEvent {
    /// Human-readable status string.
    pub message: String,
}

/// Broadcast whenever the round phase changes.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PhaseChangedEvent(pub RoundSnapshot);

/// Broadcast for every countdown tick; `None` clears the display.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountdownTickEvent {
    /// Tick value to display, absent once the countdown completes.
    pub value: Option<u32>,
}

/// Broadcast when a round's winner has been arbitrated.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct WinnerEvent {
    /// Winning player.
    pub player_id: Uuid,
    /// Winner display name.
    pub nickname: String,
    /// Authoritative reaction time.
    pub reaction_ms: u64,
    /// Winner's victory phrase.
    pub victory_chant: Option<String>,
    /// Round that was won.
    pub round_number: u32,
}

impl WinnerEvent {
    /// Build the banner payload from the arbitrated record.
    pub fn new(record: &WinnerRecord, reaction_ms: u64, round_number: u32) -> Self {
        Self {
            player_id: record.player_id,
            nickname: record.nickname.clone(),
            reaction_ms,
            victory_chant: record.victory_chant.clone(),
            round_number,
        }
    }
}

/// Broadcast with the full sorted result rows once a round is decided.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct RoundResultEvent(pub RoundResultResponse);

/// Broadcast whenever standings change.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEvent {
    /// Top rows, capped to the configured window.
    pub rows: Vec<LeaderboardRow>,
}

/// Broadcast when a player registers.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerJoinedEvent {
    /// The new player.
    pub player: PlayerSummary,
}

/// Broadcast when the operator removes a player.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerBootedEvent {
    /// Removed player.
    pub player_id: Uuid,
}

/// Broadcast when players are eliminated by an elimination-mode round.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayersEliminatedEvent {
    /// Players who just went out.
    pub player_ids: Vec<Uuid>,
    /// Round that eliminated them.
    pub round_number: u32,
}

//! Read-only projections shared by REST responses and SSE events.

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_epoch_ms,
    state::{
        models::{PlayerRecord, RoundSummary},
        round::{EndSceneStyle, Phase, RoundState},
    },
};

/// Display-ready snapshot of the round-state document.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSnapshot {
    /// Game session this snapshot belongs to.
    pub game_id: Uuid,
    /// Current phase.
    pub phase: Phase,
    /// Copy string clients display for this phase.
    pub phase_copy: String,
    /// Identifier of the active round, if one is scheduled.
    pub active_round_id: Option<String>,
    /// Number of the most recently started round.
    pub round_number: u32,
    /// Countdown tick currently displayed.
    pub countdown_value: Option<u32>,
    /// When buzzers arm (epoch ms).
    pub live_at: Option<u64>,
    /// When the reaction window closes (epoch ms).
    pub close_at: Option<u64>,
    /// Whether early buzzes disqualify.
    pub one_push_rule: bool,
    /// Whether this round eliminates players.
    pub elimination_mode: bool,
    /// End-scene style chosen for this round.
    pub end_scene_style: EndSceneStyle,
}

impl RoundSnapshot {
    /// Project a round-state document for rendering.
    pub fn new(game_id: Uuid, state: &RoundState) -> Self {
        Self {
            game_id,
            phase: state.phase,
            phase_copy: state.phase.display_copy().to_string(),
            active_round_id: state.active_round_id.clone(),
            round_number: state.round_number,
            countdown_value: state.countdown_value,
            live_at: state.live_at,
            close_at: state.close_at,
            one_push_rule: state.one_push_rule,
            elimination_mode: state.elimination_mode,
            end_scene_style: state.end_scene_style,
        }
    }
}

/// Public projection of one registered player.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Stable player identifier.
    pub id: Uuid,
    /// Display name.
    pub nickname: String,
    /// Rounds won so far.
    pub score: u32,
    /// Most recent valid reaction time.
    pub last_reaction_ms: Option<u64>,
    /// Round number the player was eliminated in, if any.
    pub eliminated_in_round: Option<u32>,
}

impl From<PlayerRecord> for PlayerSummary {
    fn from(record: PlayerRecord) -> Self {
        Self {
            id: record.id,
            nickname: record.nickname,
            score: record.score,
            last_reaction_ms: record.last_reaction_ms,
            eliminated_in_round: record.eliminated.map(|mark| mark.round_number),
        }
    }
}

/// One ranked leaderboard row.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaderboardRow {
    /// 1-based rank in the full ordering.
    pub rank: usize,
    /// Player this row describes.
    pub player_id: Uuid,
    /// Display name.
    pub nickname: String,
    /// Rounds won.
    pub score: u32,
    /// Tie-break reaction time; absent sorts last.
    pub last_reaction_ms: Option<u64>,
}

/// Leaderboard window plus the size of the full ranking behind it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Top rows, capped to the configured window.
    pub rows: Vec<LeaderboardRow>,
    /// Total number of ranked players.
    pub total_players: usize,
}

/// Full roster projection for the operator console.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterResponse {
    /// Every registered player in registration order.
    pub players: Vec<PlayerSummary>,
}

/// Result rows of the most recently decided round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundResultResponse {
    /// Persisted summary, attempts already ordered for display.
    pub summary: RoundSummary,
    /// Human-readable timestamp of the decision.
    pub decided_at_display: String,
}

impl From<RoundSummary> for RoundResultResponse {
    fn from(summary: RoundSummary) -> Self {
        let decided_at_display = format_epoch_ms(summary.decided_at);
        Self {
            summary,
            decided_at_display,
        }
    }
}

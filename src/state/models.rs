//! Record documents shared through the round store.
//!
//! Attempts and winner records are immutable once written (create-if-absent
//! only); player records are mutated by the control client alone. Everything
//! read back from the store passes through [`decode`] so malformed documents
//! are dropped at the boundary instead of reaching engine logic.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_with::skip_serializing_none;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::store::StoreKey;

/// A single player's buzz submission for one round.
///
/// Written at most once per `(round, player)` pair; a valid attempt carries
/// `buzz_at`, a disqualified one carries `too_soon` instead.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Player who buzzed.
    pub player_id: Uuid,
    /// Display name at the time of the buzz.
    pub nickname: String,
    /// Wall-clock buzz time (epoch ms); absent for too-soon attempts.
    pub buzz_at: Option<u64>,
    /// Whether the buzz arrived before the live phase.
    #[serde(default)]
    pub too_soon: bool,
    /// Optional phrase displayed if this attempt wins.
    pub victory_chant: Option<String>,
}

impl Attempt {
    /// Build a valid live-phase attempt.
    pub fn live(player: &PlayerRecord, buzz_at: u64) -> Self {
        Self {
            player_id: player.id,
            nickname: player.nickname.clone(),
            buzz_at: Some(buzz_at),
            too_soon: false,
            victory_chant: player.victory_chant.clone(),
        }
    }

    /// Build a disqualified too-soon attempt.
    pub fn too_soon(player: &PlayerRecord) -> Self {
        Self {
            player_id: player.id,
            nickname: player.nickname.clone(),
            buzz_at: None,
            too_soon: true,
            victory_chant: None,
        }
    }

    /// Reaction time against the round's `live_at`, `None` when too soon.
    pub fn reaction_ms(&self, live_at: u64) -> Option<u64> {
        if self.too_soon {
            return None;
        }
        self.buzz_at.map(|at| at.saturating_sub(live_at))
    }
}

/// The single arbitrated first-valid-buzz outcome of a round.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerRecord {
    /// Winning player.
    pub player_id: Uuid,
    /// Winner display name.
    pub nickname: String,
    /// Wall-clock buzz time of the winning attempt (epoch ms).
    pub buzz_at: u64,
    /// Winner's victory phrase, if they registered one.
    pub victory_chant: Option<String>,
}

impl WinnerRecord {
    /// Candidate record derived from a just-written valid attempt.
    pub fn from_attempt(attempt: &Attempt, buzz_at: u64) -> Self {
        Self {
            player_id: attempt.player_id,
            nickname: attempt.nickname.clone(),
            buzz_at,
            victory_chant: attempt.victory_chant.clone(),
        }
    }
}

/// Why and when a player was eliminated. Monotonic: never cleared by rounds,
/// only by an explicit game refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Elimination {
    /// Round in which the player went out.
    pub round_id: String,
    /// Number of that round.
    pub round_number: u32,
    /// When the elimination was recorded (epoch ms).
    pub at: u64,
    /// What got the player eliminated.
    pub kind: EliminationKind,
}

/// Cause of an elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EliminationKind {
    /// Buzzed before GO.
    TooSoon,
    /// Slowest valid reaction of the round.
    Slowest,
}

/// One registered player.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Stable player identifier.
    pub id: Uuid,
    /// Public display name.
    pub nickname: String,
    /// Given name from the registration profile.
    pub first_name: String,
    /// Family name from the registration profile.
    pub last_name: String,
    /// Optional phrase shown when this player wins a round.
    pub victory_chant: Option<String>,
    /// Rounds won so far.
    #[serde(default)]
    pub score: u32,
    /// Reaction time of the player's most recent valid attempt.
    pub last_reaction_ms: Option<u64>,
    /// Present once the player has been eliminated.
    pub eliminated: Option<Elimination>,
    /// Registration timestamp (epoch ms), used for stable roster ordering.
    #[serde(default)]
    pub registered_at: u64,
}

impl PlayerRecord {
    /// Minimal record recreated defensively when scoring finds no document
    /// for the winner (e.g. the player was booted mid-round).
    pub fn recovered(winner: &WinnerRecord, now_ms: u64) -> Self {
        Self {
            id: winner.player_id,
            nickname: winner.nickname.clone(),
            first_name: String::new(),
            last_name: String::new(),
            victory_chant: winner.victory_chant.clone(),
            score: 0,
            last_reaction_ms: None,
            eliminated: None,
            registered_at: now_ms,
        }
    }
}

/// One row of the persisted round result, already ordered for display.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttemptOutcome {
    /// Player who attempted.
    pub player_id: Uuid,
    /// Display name of that player.
    pub nickname: String,
    /// Authoritative reaction time, absent for too-soon attempts.
    pub reaction_ms: Option<u64>,
    /// Whether this attempt was disqualified as too soon.
    pub too_soon: bool,
    /// Whether this attempt won the round.
    pub winner: bool,
}

/// Persisted summary of a decided round.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoundSummary {
    /// Round this summary belongs to.
    pub round_id: String,
    /// Number of that round.
    pub round_number: u32,
    /// Winning player, absent when the window closed with no valid buzz.
    pub winner_id: Option<Uuid>,
    /// Winner's victory phrase.
    pub victory_chant: Option<String>,
    /// Winner's authoritative reaction time.
    pub winner_reaction_ms: Option<u64>,
    /// Every attempt of the round, too-soon first, then fastest to slowest.
    pub attempts: Vec<AttemptOutcome>,
    /// When the summary was computed (epoch ms).
    pub decided_at: u64,
}

/// Decode a store document, logging and discarding malformed payloads.
pub fn decode<T: DeserializeOwned>(key: &StoreKey, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(%key, error = %err, "discarding malformed store document");
            None
        }
    }
}

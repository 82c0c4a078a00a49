//! DTO definitions used by the player surface.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::dto::{
    public::PlayerSummary,
    validation::{validate_nickname, validate_person_name, validate_victory_chant},
};

/// Registration profile submitted by a joining player.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Game session the player wants to join.
    pub game_id: Uuid,
    /// Public display name.
    pub nickname: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Optional phrase displayed when this player wins a round.
    #[serde(default)]
    pub victory_chant: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_nickname(&self.nickname) {
            errors.add("nickname", e);
        }
        if let Err(e) = validate_person_name(&self.first_name) {
            errors.add("first_name", e);
        }
        if let Err(e) = validate_person_name(&self.last_name) {
            errors.add("last_name", e);
        }
        if let Some(chant) = &self.victory_chant {
            if let Err(e) = validate_victory_chant(chant) {
                errors.add("victory_chant", e);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Response confirming a successful registration.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    /// The freshly created player record.
    pub player: PlayerSummary,
}

/// How a buzz submission was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuzzStatus {
    /// First valid buzz of the round — this player won.
    Winner,
    /// Valid buzz recorded, but another player was first.
    Recorded,
    /// Buzz arrived before GO and was recorded as disqualifying.
    TooSoon,
    /// The player had already submitted this round; nothing changed.
    Duplicate,
}

/// Response to a buzz submission.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct BuzzResponse {
    /// Classification of the submission.
    pub status: BuzzStatus,
    /// Locally estimated reaction time for immediate display; the
    /// authoritative time is recomputed from the stored attempt.
    pub reaction_estimate_ms: Option<u64>,
    /// Status string for the player's screen.
    pub message: String,
}

impl BuzzResponse {
    /// Winning buzz.
    pub fn winner(reaction_estimate_ms: u64) -> Self {
        Self {
            status: BuzzStatus::Winner,
            reaction_estimate_ms: Some(reaction_estimate_ms),
            message: "You were first!".into(),
        }
    }

    /// Valid but losing buzz.
    pub fn recorded(reaction_estimate_ms: u64) -> Self {
        Self {
            status: BuzzStatus::Recorded,
            reaction_estimate_ms: Some(reaction_estimate_ms),
            message: "Buzz recorded — someone beat you to it".into(),
        }
    }

    /// Disqualifying early buzz.
    pub fn too_soon() -> Self {
        Self {
            status: BuzzStatus::TooSoon,
            reaction_estimate_ms: None,
            message: "Too soon! That one counts against you".into(),
        }
    }

    /// Replayed submission; the original attempt stands.
    pub fn duplicate() -> Self {
        Self {
            status: BuzzStatus::Duplicate,
            reaction_estimate_ms: None,
            message: "Already buzzed this round".into(),
        }
    }
}

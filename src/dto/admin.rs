//! DTO definitions used by the operator (control) REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{dto::public::PlayerSummary, state::round::EndSceneStyle};

/// Shortest accepted countdown duration.
const COUNTDOWN_MIN_MS: u64 = 1_000;
/// Longest accepted countdown duration.
const COUNTDOWN_MAX_MS: u64 = 60_000;
/// Shortest accepted reaction window.
const WINDOW_MIN_MS: u64 = 1_000;
/// Longest accepted reaction window.
const WINDOW_MAX_MS: u64 = 120_000;

/// Payload scheduling a new fastest-finger round.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartRoundRequest {
    /// Countdown duration; the configured default applies when omitted.
    #[serde(default)]
    pub countdown_ms: Option<u64>,
    /// Reaction-window duration; the configured default applies when omitted.
    #[serde(default)]
    pub window_ms: Option<u64>,
    /// Record early buzzes as disqualifying too-soon attempts.
    #[serde(default)]
    pub one_push_rule: bool,
    /// Eliminate too-soon buzzers and the slowest respondent this round.
    #[serde(default)]
    pub elimination_mode: bool,
    /// End-of-game scene style shown when a champion is declared.
    #[serde(default)]
    pub end_scene_style: EndSceneStyle,
}

impl Validate for StartRoundRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(ms) = self.countdown_ms {
            if let Err(e) = validate_duration(ms, COUNTDOWN_MIN_MS, COUNTDOWN_MAX_MS, "countdown")
            {
                errors.add("countdown_ms", e);
            }
        }
        if let Some(ms) = self.window_ms {
            if let Err(e) = validate_duration(ms, WINDOW_MIN_MS, WINDOW_MAX_MS, "window") {
                errors.add("window_ms", e);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn validate_duration(ms: u64, min: u64, max: u64, what: &str) -> Result<(), ValidationError> {
    if !(min..=max).contains(&ms) {
        let mut err = ValidationError::new("duration_range");
        err.message = Some(format!("{what} duration must be between {min} and {max} ms").into());
        return Err(err);
    }
    Ok(())
}

/// Response emitted once a round has been scheduled.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartRoundResponse {
    /// Identifier of the scheduled round.
    pub round_id: String,
    /// Number of the scheduled round.
    pub round_number: u32,
    /// Number of countdown ticks that will be displayed.
    pub ticks: u32,
    /// When the suspense pause begins (epoch ms).
    pub suspense_at: u64,
    /// When buzzers arm (epoch ms).
    pub live_at: u64,
    /// When the reaction window closes (epoch ms).
    pub close_at: u64,
}

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Human-readable status string.
    pub message: String,
}

impl ActionResponse {
    /// Wrap a status message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response returned when the operator declares the final champion.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinalWinnerResponse {
    /// The one surviving player.
    pub champion: PlayerSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_durations_pass_validation() {
        let request = StartRoundRequest {
            countdown_ms: None,
            window_ms: None,
            one_push_rule: false,
            elimination_mode: false,
            end_scene_style: EndSceneStyle::default(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn out_of_range_durations_are_rejected() {
        let request = StartRoundRequest {
            countdown_ms: Some(10),
            window_ms: Some(WINDOW_MAX_MS + 1),
            one_push_rule: false,
            elimination_mode: false,
            end_scene_style: EndSceneStyle::default(),
        };
        let errors = request.validate().unwrap_err().to_string();
        assert!(errors.contains("countdown"));
        assert!(errors.contains("window"));
    }
}

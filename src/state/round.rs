//! The authoritative round-state document and its phase rules.
//!
//! Exactly one writer (the control client) mutates this document; every
//! client renders from it. Readers must treat `phase` plus the scheduled
//! timestamps as the sole truth and never infer the phase from wall-clock
//! reads of their own.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

/// Lifecycle stage of a fastest-finger round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Players can join; no round is scheduled.
    #[default]
    Register,
    /// The countdown sequence is being displayed.
    Countdown,
    /// Countdown finished; randomized pause before GO.
    Suspense,
    /// Buzzers are armed; the reaction window is open.
    Live,
    /// The round is decided or the window closed; results are shown.
    Locked,
    /// A final champion was declared; terminal until a manual session reset.
    Finished,
}

impl Phase {
    /// Whether a round is currently being run to completion.
    ///
    /// Starting a new round is rejected in exactly these phases, so at most
    /// one round is in flight.
    pub fn round_in_flight(self) -> bool {
        matches!(self, Phase::Countdown | Phase::Live)
    }

    /// Whether an `active_round_id` must be present in this phase.
    pub fn has_active_round(self) -> bool {
        matches!(
            self,
            Phase::Countdown | Phase::Suspense | Phase::Live | Phase::Locked
        )
    }

    /// Display copy clients show for this phase.
    pub fn display_copy(self) -> &'static str {
        match self {
            Phase::Register => "Waiting for the next round…",
            Phase::Countdown => "Get ready…",
            Phase::Suspense => "Wait for it…",
            Phase::Live => "GO!",
            Phase::Locked => "Round over — checking the times…",
            Phase::Finished => "We have a champion!",
        }
    }
}

/// Visual style of the end-of-game scene, chosen per round by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EndSceneStyle {
    /// Confetti rain.
    #[default]
    Confetti,
    /// Fireworks burst.
    Fireworks,
    /// No end-scene animation.
    Calm,
}

/// Error raised when the operator tries to start a round mid-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a round is already in flight (phase {phase:?})")]
pub struct RoundInFlight {
    /// Phase that blocked the start.
    pub phase: Phase,
}

/// The singleton round-state document of a game session.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundState {
    /// Current lifecycle stage.
    #[serde(default)]
    pub phase: Phase,
    /// Identifier of the scheduled round, present iff a round is active.
    pub active_round_id: Option<String>,
    /// When the countdown display ends and the suspense pause begins.
    pub suspense_at: Option<u64>,
    /// When buzzers arm (epoch ms); reaction times are measured from here.
    pub live_at: Option<u64>,
    /// When the reaction window closes (epoch ms).
    pub close_at: Option<u64>,
    /// Length of the randomized suspense pause.
    pub suspense_ms: Option<u64>,
    /// Countdown tick currently displayed, absent outside the countdown.
    pub countdown_value: Option<u32>,
    /// Whether early buzzes are recorded as disqualifying too-soon attempts.
    #[serde(default)]
    pub one_push_rule: bool,
    /// Whether this round eliminates players (too-soon plus slowest).
    #[serde(default)]
    pub elimination_mode: bool,
    /// End-of-game scene style chosen at round start.
    #[serde(default)]
    pub end_scene_style: EndSceneStyle,
    /// Monotonically increasing counter of started rounds.
    #[serde(default)]
    pub round_number: u32,
    /// Last-write timestamp, for observability only.
    #[serde(default)]
    pub updated_at: u64,
}

impl RoundState {
    /// Normalize a raw store document into a typed round state.
    ///
    /// Absent or malformed documents fall back to the default register state
    /// so a corrupt write can never wedge the engine.
    pub fn from_value(value: Option<Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        serde_json::from_value(value).unwrap_or_else(|err| {
            warn!(error = %err, "malformed round-state document; using defaults");
            Self::default()
        })
    }

    /// Check that a new round may be scheduled right now.
    pub fn ensure_can_start(&self) -> Result<(), RoundInFlight> {
        if self.phase.round_in_flight() {
            return Err(RoundInFlight { phase: self.phase });
        }
        Ok(())
    }

    /// Earliest-due guard transition for wall-clock `now_ms`, if any.
    ///
    /// Conditions are checked in schedule order and only the first match is
    /// returned, so a guard invoked at an arbitrary cadence catches up one
    /// phase per pass and never skips a state. Each rule only applies to the
    /// phases it can legally advance; locked and finished never move here.
    pub fn due_transition(&self, now_ms: u64) -> Option<Phase> {
        if self.phase == Phase::Countdown
            && self.suspense_at.is_some_and(|at| now_ms >= at)
        {
            return Some(Phase::Suspense);
        }
        if matches!(self.phase, Phase::Countdown | Phase::Suspense)
            && self.live_at.is_some_and(|at| now_ms >= at)
        {
            return Some(Phase::Live);
        }
        if matches!(self.phase, Phase::Countdown | Phase::Suspense | Phase::Live)
            && self.close_at.is_some_and(|at| now_ms >= at)
        {
            return Some(Phase::Locked);
        }
        None
    }
}

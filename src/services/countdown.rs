//! Countdown sequencing for the control side of a round.
//!
//! The sequencer only drives the `countdown_value` display field. The phase
//! thresholds (`suspense_at`, `live_at`, `close_at`) are fixed at round start
//! and enforced by the phase guard, so tick cadence can drift without moving
//! any phase change.

use std::time::Duration;

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    services::sse_events,
    state::{SharedState, clock::Clock},
    store::keys,
};

/// Descending tick values for a requested countdown duration.
///
/// The sequence runs `[N, N-1, .., 1]` with `N = max(3, round(ms / 1000))`,
/// so even very short countdowns show at least three ticks.
pub fn tick_sequence(countdown_ms: u64) -> Vec<u32> {
    let rounded = ((countdown_ms + 500) / 1_000) as u32;
    let ticks = rounded.max(3);
    (1..=ticks).rev().collect()
}

/// Absolute schedule of one round, computed once at start.
#[derive(Debug, Clone)]
pub struct RoundSchedule {
    /// Identifier of the scheduled round.
    pub round_id: String,
    /// Number of the scheduled round.
    pub round_number: u32,
    /// When the round was started (epoch ms).
    pub started_at: u64,
    /// Countdown duration.
    pub countdown_ms: u64,
    /// Randomized suspense pause between countdown end and GO.
    pub suspense_ms: u64,
    /// When the countdown display ends (epoch ms).
    pub suspense_at: u64,
    /// When buzzers arm (epoch ms).
    pub live_at: u64,
    /// When the reaction window closes (epoch ms).
    pub close_at: u64,
}

impl RoundSchedule {
    /// Derive the absolute schedule from the requested durations.
    pub fn generate(
        now_ms: u64,
        countdown_ms: u64,
        window_ms: u64,
        suspense_ms: u64,
        round_number: u32,
    ) -> Self {
        let suspense_at = now_ms + countdown_ms;
        let live_at = suspense_at + suspense_ms;
        Self {
            round_id: Uuid::new_v4().simple().to_string(),
            round_number,
            started_at: now_ms,
            countdown_ms,
            suspense_ms,
            suspense_at,
            live_at,
            close_at: live_at + window_ms,
        }
    }

    /// Number of ticks the sequencer will display.
    pub fn ticks(&self) -> u32 {
        tick_sequence(self.countdown_ms).len() as u32
    }

    /// Absolute display time of tick `index`, spread evenly across the
    /// countdown. Recomputed from the schedule each time, never from a
    /// running counter, so a delayed tick does not shift later ones.
    fn tick_at(&self, index: u64) -> u64 {
        self.started_at + index * self.countdown_ms / u64::from(self.ticks())
    }
}

/// Drive the countdown display of one round to completion.
///
/// The loop captures the round epoch it was spawned with and aborts silently
/// as soon as the state's epoch moves past it, so a superseded countdown can
/// never overwrite a newer round's display. Tick write failures are logged
/// and skipped; the next tick recomputes from the absolute schedule.
pub async fn run_countdown(state: SharedState, epoch: u64, schedule: RoundSchedule) {
    let key = keys::round_state(state.game_id());

    for (index, value) in tick_sequence(schedule.countdown_ms).into_iter().enumerate() {
        sleep_until_ms(state.clock(), schedule.tick_at(index as u64)).await;
        if state.round_epoch() != epoch {
            return;
        }

        let patch = json!({
            "countdown_value": value,
            "updated_at": state.clock().now_ms(),
        });
        if let Err(err) = state.store().update(&key, patch).await {
            warn!(error = %err, tick = value, "countdown tick write failed; skipping tick");
            continue;
        }
        sse_events::broadcast_countdown_tick(&state, Some(value));
    }

    sleep_until_ms(state.clock(), schedule.suspense_at).await;
    if state.round_epoch() != epoch {
        return;
    }

    let patch = json!({
        "countdown_value": null,
        "updated_at": state.clock().now_ms(),
    });
    match state.store().update(&key, patch).await {
        Ok(()) => sse_events::broadcast_countdown_tick(&state, None),
        Err(err) => warn!(error = %err, "failed to clear countdown display"),
    }
}

async fn sleep_until_ms(clock: &dyn Clock, deadline_ms: u64) {
    let now = clock.now_ms();
    if deadline_ms > now {
        tokio::time::sleep(Duration::from_millis(deadline_ms - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, clock::ManualClock},
        store::{RoundStore, memory::MemoryStore},
    };

    fn test_state(now_ms: u64) -> (SharedState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            AppConfig::default(),
            Uuid::new_v4(),
            store.clone(),
            Arc::new(ManualClock::at(now_ms)),
        );
        (state, store)
    }

    #[test]
    fn tick_count_is_rounded_seconds_with_floor_of_three() {
        assert_eq!(tick_sequence(5_000), vec![5, 4, 3, 2, 1]);
        assert_eq!(tick_sequence(5_499).len(), 5);
        assert_eq!(tick_sequence(5_500).len(), 6);
        // Short countdowns still display three ticks.
        assert_eq!(tick_sequence(500), vec![3, 2, 1]);
        assert_eq!(tick_sequence(0), vec![3, 2, 1]);
    }

    #[test]
    fn sequence_runs_strictly_from_n_down_to_one() {
        for ms in [1_000u64, 3_000, 4_200, 10_000, 59_999] {
            let ticks = tick_sequence(ms);
            assert_eq!(ticks[0] as usize, ticks.len());
            assert!(ticks.windows(2).all(|pair| pair[0] == pair[1] + 1));
            assert_eq!(*ticks.last().unwrap(), 1);
        }
    }

    #[test]
    fn schedule_orders_thresholds() {
        let schedule = RoundSchedule::generate(10_000, 3_000, 5_000, 1_500, 1);
        assert_eq!(schedule.suspense_at, 13_000);
        assert_eq!(schedule.live_at, 14_500);
        assert_eq!(schedule.close_at, 19_500);
        assert!(schedule.live_at < schedule.close_at);
        assert_eq!(schedule.ticks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn full_run_writes_ticks_and_clears_display() {
        let (state, store) = test_state(10_000);
        let schedule = RoundSchedule::generate(10_000, 3_000, 5_000, 1_500, 1);
        let epoch = state.round_epoch();

        run_countdown(state.clone(), epoch, schedule).await;

        let doc = store
            .get(&keys::round_state(state.game_id()))
            .await
            .unwrap()
            .unwrap();
        let object = doc.as_object().unwrap();
        assert!(!object.contains_key("countdown_value"));
        assert!(object.contains_key("updated_at"));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_countdown_never_writes() {
        let (state, store) = test_state(10_000);
        let schedule = RoundSchedule::generate(10_000, 3_000, 5_000, 1_500, 1);
        let stale_epoch = state.round_epoch();
        state.bump_round_epoch();

        run_countdown(state.clone(), stale_epoch, schedule).await;

        let doc = store
            .get(&keys::round_state(state.game_id()))
            .await
            .unwrap();
        assert_eq!(doc, None);
    }
}

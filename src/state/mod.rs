//! Shared application state and the typed session context every component
//! attaches to.

pub mod clock;
pub mod models;
pub mod round;
mod sse;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashSet;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ServiceError,
    state::{clock::Clock, round::RoundState},
    store::{RoundStore, keys},
};

pub use self::sse::SseHub;

/// Cheaply clonable handle to the shared application state.
pub type SharedState = Arc<AppState>;

/// Central state of the control client: store and clock handles, SSE hubs,
/// and the per-round bookkeeping that keeps asynchronous loops honest.
pub struct AppState {
    config: AppConfig,
    game_id: Uuid,
    store: Arc<dyn RoundStore>,
    clock: Arc<dyn Clock>,
    sse: sse::SseState,
    /// Generation counter invalidating in-flight countdown loops and winner
    /// watchers; bumped on every round start and reset.
    round_epoch: AtomicU64,
    /// Rounds whose winner has already been finalized.
    decided_rounds: DashSet<String>,
    /// Rounds whose eliminations have already been applied.
    resolved_rounds: DashSet<String>,
    /// Winner watcher of the active round, replaced on start and reset.
    winner_watch: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    /// Construct the shared state around a store backend and clock source.
    pub fn new(
        config: AppConfig,
        game_id: Uuid,
        store: Arc<dyn RoundStore>,
        clock: Arc<dyn Clock>,
    ) -> SharedState {
        let sse = sse::SseState::new(config.sse_capacity);
        Arc::new(Self {
            config,
            game_id,
            store,
            clock,
            sse,
            round_epoch: AtomicU64::new(0),
            decided_rounds: DashSet::new(),
            resolved_rounds: DashSet::new(),
            winner_watch: Mutex::new(None),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Identifier of the hosted game session.
    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Handle to the shared round store.
    pub fn store(&self) -> &dyn RoundStore {
        self.store.as_ref()
    }

    /// Wall-clock source.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Broadcast hub for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub for the operator SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        self.sse.admin()
    }

    /// Token guard ensuring a single operator SSE subscriber at a time.
    pub fn admin_token(&self) -> &Mutex<Option<String>> {
        self.sse.admin_token()
    }

    /// Current round epoch; asynchronous loops capture this at spawn time and
    /// compare before every write.
    pub fn round_epoch(&self) -> u64 {
        self.round_epoch.load(Ordering::Acquire)
    }

    /// Invalidate all in-flight loops of the previous round; returns the new
    /// epoch for loops started by the caller.
    pub fn bump_round_epoch(&self) -> u64 {
        self.round_epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Claim winner finalization for a round; false when already processed.
    pub fn mark_round_decided(&self, round_id: &str) -> bool {
        self.decided_rounds.insert(round_id.to_owned())
    }

    /// Release a finalization claim so a later notification can retry after a
    /// persistence failure.
    pub fn unmark_round_decided(&self, round_id: &str) {
        self.decided_rounds.remove(round_id);
    }

    /// Claim elimination resolution for a round; false when already applied.
    pub fn mark_round_resolved(&self, round_id: &str) -> bool {
        self.resolved_rounds.insert(round_id.to_owned())
    }

    /// Forget all processed-round marks (game refresh).
    pub fn clear_round_marks(&self) {
        self.decided_rounds.clear();
        self.resolved_rounds.clear();
    }

    /// Install the winner watcher of a freshly started round, detaching the
    /// previous round's watcher if one is still attached.
    pub async fn attach_winner_watch(&self, handle: Option<JoinHandle<()>>) {
        let mut slot = self.winner_watch.lock().await;
        if let Some(previous) = std::mem::replace(&mut *slot, handle) {
            previous.abort();
        }
    }

    /// Read and normalize the round-state document.
    pub async fn round_state(&self) -> Result<RoundState, ServiceError> {
        let value = self.store.get(&keys::round_state(self.game_id)).await?;
        Ok(RoundState::from_value(value))
    }
}
